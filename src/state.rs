//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds one view registry per dataset; each registry owns its open view
//! sessions and the data source they load from.

use crate::config::ViewConfig;
use crate::records::{AnomalyReport, PerformanceLog};
use crate::services::views::ViewRegistry;
use crate::sources::Sources;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; registries are Arc-backed.
#[derive(Clone)]
pub struct AppState {
    pub anomalies: ViewRegistry<AnomalyReport>,
    pub performance_logs: ViewRegistry<PerformanceLog>,
}

impl AppState {
    #[must_use]
    pub fn new(sources: Sources, config: ViewConfig) -> Self {
        Self {
            anomalies: ViewRegistry::new(sources.anomalies, config),
            performance_logs: ViewRegistry::new(sources.performance_logs, config),
        }
    }

    #[must_use]
    pub fn view_config(&self) -> &ViewConfig {
        self.anomalies.config()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use tableview::{DataSource, SourceError, StaticSource};

    use super::*;
    use crate::records::{AnomalyKind, AnomalyStatus};

    /// Create a test `AppState` backed by the bundled fixtures.
    #[must_use]
    pub fn test_app_state() -> AppState {
        test_app_state_with_config(ViewConfig::default())
    }

    #[must_use]
    pub fn test_app_state_with_config(config: ViewConfig) -> AppState {
        AppState::new(Sources::fixtures().expect("fixtures should parse"), config)
    }

    /// `AppState` whose anomaly source is the given one.
    #[must_use]
    pub fn test_app_state_with_anomalies(source: Arc<dyn DataSource<AnomalyReport>>, config: ViewConfig) -> AppState {
        let mut sources = Sources::fixtures().expect("fixtures should parse");
        sources.anomalies = source;
        AppState::new(sources, config)
    }

    #[must_use]
    pub fn anomaly(id: &str, severity: i32, status: AnomalyStatus) -> AnomalyReport {
        AnomalyReport {
            id: id.into(),
            vehicle_id: "TRK-100".into(),
            kind: AnomalyKind::Engine,
            severity,
            status,
            description: format!("test anomaly {id}"),
            detected_at: 1_760_000_000_000,
            confidence: 0.9,
        }
    }

    /// `[{A,9},{B,5},{C,7}]`.
    #[must_use]
    pub fn abc_source() -> Arc<dyn DataSource<AnomalyReport>> {
        Arc::new(StaticSource::new(
            "test:abc",
            vec![
                anomaly("A", 9, AnomalyStatus::Open),
                anomaly("B", 5, AnomalyStatus::Resolved),
                anomaly("C", 7, AnomalyStatus::Open),
            ],
        ))
    }

    /// Serves `items` until switched off, then fails every fetch.
    pub struct FlakySource {
        items: Vec<AnomalyReport>,
        healthy: AtomicBool,
    }

    impl FlakySource {
        #[must_use]
        pub fn new(items: Vec<AnomalyReport>) -> Self {
            Self { items, healthy: AtomicBool::new(true) }
        }

        pub fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl DataSource<AnomalyReport> for FlakySource {
        fn name(&self) -> &str {
            "test:flaky"
        }

        async fn fetch(&self) -> Result<Vec<AnomalyReport>, SourceError> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(self.items.clone())
            } else {
                Err(SourceError::Unavailable("upstream timed out".into()))
            }
        }
    }

    /// Blocks each fetch until released, for in-flight refresh tests.
    pub struct GatedSource {
        items: Vec<AnomalyReport>,
        gate: tokio::sync::Semaphore,
    }

    impl GatedSource {
        #[must_use]
        pub fn new(items: Vec<AnomalyReport>) -> Self {
            Self { items, gate: tokio::sync::Semaphore::new(0) }
        }

        /// Let one pending fetch through.
        pub fn release_one(&self) {
            self.gate.add_permits(1);
        }
    }

    #[async_trait::async_trait]
    impl DataSource<AnomalyReport> for GatedSource {
        fn name(&self) -> &str {
            "test:gated"
        }

        async fn fetch(&self) -> Result<Vec<AnomalyReport>, SourceError> {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| SourceError::Unavailable(e.to_string()))?;
            permit.forget();
            Ok(self.items.clone())
        }
    }
}

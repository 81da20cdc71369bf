//! Data sources backing the view registries.
//!
//! DESIGN
//! ======
//! A view always receives the whole collection; sources never see search,
//! filter or paging state. Startup picks one source per dataset: Postgres
//! tables when a pool is configured, otherwise the fixture collections
//! bundled into the binary.

pub mod fixtures;
pub mod postgres;

use std::sync::Arc;

use sqlx::PgPool;
use tableview::{DataSource, SourceError};

use crate::records::{AnomalyReport, PerformanceLog};

/// One source per dataset.
#[derive(Clone)]
pub struct Sources {
    pub anomalies: Arc<dyn DataSource<AnomalyReport>>,
    pub performance_logs: Arc<dyn DataSource<PerformanceLog>>,
}

impl Sources {
    /// Serve the bundled fixture collections.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Malformed`] if a bundled fixture fails to parse.
    pub fn fixtures() -> Result<Self, SourceError> {
        Ok(Self {
            anomalies: Arc::new(fixtures::anomalies()?),
            performance_logs: Arc::new(fixtures::performance_logs()?),
        })
    }

    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            anomalies: Arc::new(postgres::PgAnomalySource::new(pool.clone())),
            performance_logs: Arc::new(postgres::PgPerformanceLogSource::new(pool)),
        }
    }
}

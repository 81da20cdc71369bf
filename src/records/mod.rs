//! Record types served through table views.

pub mod anomaly;
pub mod performance_log;

pub use anomaly::{AnomalyKind, AnomalyReport, AnomalyStatus};
pub use performance_log::{LogLevel, PerformanceLog};

/// A stored string that names no variant of a record enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

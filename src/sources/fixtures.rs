//! Static collections bundled into the binary.

use serde::de::DeserializeOwned;
use tableview::{SourceError, StaticSource};

use crate::records::{AnomalyReport, PerformanceLog};

const ANOMALIES_JSON: &str = include_str!("../../fixtures/anomalies.json");
const PERFORMANCE_LOGS_JSON: &str = include_str!("../../fixtures/performance_logs.json");

/// # Errors
///
/// Returns [`SourceError::Malformed`] if the bundled JSON does not parse.
pub fn anomalies() -> Result<StaticSource<AnomalyReport>, SourceError> {
    Ok(StaticSource::new("fixtures:anomalies", parse(ANOMALIES_JSON)?))
}

/// # Errors
///
/// Returns [`SourceError::Malformed`] if the bundled JSON does not parse.
pub fn performance_logs() -> Result<StaticSource<PerformanceLog>, SourceError> {
    Ok(StaticSource::new("fixtures:performance_logs", parse(PERFORMANCE_LOGS_JSON)?))
}

fn parse<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, SourceError> {
    serde_json::from_str(raw).map_err(|e| SourceError::Malformed(e.to_string()))
}

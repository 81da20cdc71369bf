//! Postgres-backed sources: one full-table `SELECT` per fetch.

use sqlx::PgPool;
use tableview::{DataSource, SourceError};

use crate::records::{AnomalyKind, AnomalyReport, AnomalyStatus, LogLevel, PerformanceLog};

type AnomalyRow = (String, String, String, i32, String, String, i64, f64);
type PerformanceLogRow = (String, String, String, String, f64, i64);

pub struct PgAnomalySource {
    pool: PgPool,
}

impl PgAnomalySource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DataSource<AnomalyReport> for PgAnomalySource {
    fn name(&self) -> &str {
        "postgres:anomaly_reports"
    }

    async fn fetch(&self) -> Result<Vec<AnomalyReport>, SourceError> {
        let rows = sqlx::query_as::<_, AnomalyRow>(
            "SELECT id, vehicle_id, kind, severity, status, description, detected_at, confidence
             FROM anomaly_reports
             ORDER BY detected_at DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.into_iter().map(anomaly_from_row).collect()
    }
}

pub struct PgPerformanceLogSource {
    pool: PgPool,
}

impl PgPerformanceLogSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DataSource<PerformanceLog> for PgPerformanceLogSource {
    fn name(&self) -> &str {
        "postgres:performance_logs"
    }

    async fn fetch(&self) -> Result<Vec<PerformanceLog>, SourceError> {
        let rows = sqlx::query_as::<_, PerformanceLogRow>(
            r#"SELECT id, component, level, message, response_time_ms, "timestamp"
               FROM performance_logs
               ORDER BY "timestamp" DESC, id ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.into_iter().map(performance_log_from_row).collect()
    }
}

fn database_error(err: sqlx::Error) -> SourceError {
    SourceError::Unavailable(err.to_string())
}

pub(crate) fn anomaly_from_row(row: AnomalyRow) -> Result<AnomalyReport, SourceError> {
    let (id, vehicle_id, kind, severity, status, description, detected_at, confidence) = row;
    let kind = kind.parse::<AnomalyKind>().map_err(|e| SourceError::Malformed(format!("anomaly {id}: {e}")))?;
    let status = status.parse::<AnomalyStatus>().map_err(|e| SourceError::Malformed(format!("anomaly {id}: {e}")))?;

    Ok(AnomalyReport { id, vehicle_id, kind, severity, status, description, detected_at, confidence })
}

pub(crate) fn performance_log_from_row(row: PerformanceLogRow) -> Result<PerformanceLog, SourceError> {
    let (id, component, level, message, response_time_ms, timestamp) = row;
    let level = level.parse::<LogLevel>().map_err(|e| SourceError::Malformed(format!("performance log {id}: {e}")))?;

    Ok(PerformanceLog { id, component, level, message, response_time_ms, timestamp })
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;

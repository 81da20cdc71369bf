//! Technical performance log entries emitted by fleet services.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tableview::{Field, FieldKind, FieldValue, Record};

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for LogLevel {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            _ => Err(UnknownVariant { kind: "log level", value: raw.to_owned() }),
        }
    }
}

/// Mirrors the `performance_logs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceLog {
    pub id: String,
    pub component: String,
    pub level: LogLevel,
    pub message: String,
    pub response_time_ms: f64,
    /// Unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PerformanceLogField {
    Id,
    Component,
    Level,
    Message,
    ResponseTimeMs,
    Timestamp,
}

impl Field for PerformanceLogField {
    const ALL: &'static [Self] =
        &[Self::Id, Self::Component, Self::Level, Self::Message, Self::ResponseTimeMs, Self::Timestamp];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Component => "component",
            Self::Level => "level",
            Self::Message => "message",
            Self::ResponseTimeMs => "response_time_ms",
            Self::Timestamp => "timestamp",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::ResponseTimeMs | Self::Timestamp => FieldKind::Numeric,
            Self::Id | Self::Component | Self::Level | Self::Message => FieldKind::Text,
        }
    }

    fn filterable(self) -> bool {
        matches!(self, Self::Component | Self::Level)
    }
}

impl Record for PerformanceLog {
    type Field = PerformanceLogField;

    const SEARCH_FIELDS: &'static [PerformanceLogField] =
        &[PerformanceLogField::Id, PerformanceLogField::Component, PerformanceLogField::Message];
    const DEFAULT_SORT: PerformanceLogField = PerformanceLogField::Timestamp;

    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, field: PerformanceLogField) -> FieldValue<'_> {
        match field {
            PerformanceLogField::Id => FieldValue::text(&self.id),
            PerformanceLogField::Component => FieldValue::text(&self.component),
            PerformanceLogField::Level => FieldValue::text(self.level.as_str()),
            PerformanceLogField::Message => FieldValue::text(&self.message),
            PerformanceLogField::ResponseTimeMs => FieldValue::Number(self.response_time_ms),
            #[allow(clippy::cast_precision_loss)]
            PerformanceLogField::Timestamp => FieldValue::Number(self.timestamp as f64),
        }
    }
}

#[cfg(test)]
#[path = "performance_log_test.rs"]
mod tests;

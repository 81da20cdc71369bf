//! Vehicle anomaly reports.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tableview::{Field, FieldKind, FieldValue, Record};

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Fuel,
    Engine,
    Route,
    Tire,
    Temperature,
    Other,
}

impl AnomalyKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fuel => "fuel",
            Self::Engine => "engine",
            Self::Route => "route",
            Self::Tire => "tire",
            Self::Temperature => "temperature",
            Self::Other => "other",
        }
    }
}

impl FromStr for AnomalyKind {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "fuel" => Ok(Self::Fuel),
            "engine" => Ok(Self::Engine),
            "route" => Ok(Self::Route),
            "tire" => Ok(Self::Tire),
            "temperature" => Ok(Self::Temperature),
            "other" => Ok(Self::Other),
            _ => Err(UnknownVariant { kind: "anomaly kind", value: raw.to_owned() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyStatus {
    Open,
    Investigating,
    Resolved,
    Dismissed,
}

impl AnomalyStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }
}

impl FromStr for AnomalyStatus {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "open" => Ok(Self::Open),
            "investigating" => Ok(Self::Investigating),
            "resolved" => Ok(Self::Resolved),
            "dismissed" => Ok(Self::Dismissed),
            _ => Err(UnknownVariant { kind: "anomaly status", value: raw.to_owned() }),
        }
    }
}

/// One anomaly raised against a vehicle. Mirrors the `anomaly_reports` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub id: String,
    pub vehicle_id: String,
    pub kind: AnomalyKind,
    /// 1 (informational) to 10 (vehicle must stop).
    pub severity: i32,
    pub status: AnomalyStatus,
    pub description: String,
    /// Unix milliseconds.
    pub detected_at: i64,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnomalyField {
    Id,
    VehicleId,
    Kind,
    Severity,
    Status,
    Description,
    DetectedAt,
    Confidence,
}

impl Field for AnomalyField {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::VehicleId,
        Self::Kind,
        Self::Severity,
        Self::Status,
        Self::Description,
        Self::DetectedAt,
        Self::Confidence,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::VehicleId => "vehicle_id",
            Self::Kind => "kind",
            Self::Severity => "severity",
            Self::Status => "status",
            Self::Description => "description",
            Self::DetectedAt => "detected_at",
            Self::Confidence => "confidence",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Severity | Self::DetectedAt | Self::Confidence => FieldKind::Numeric,
            Self::Id | Self::VehicleId | Self::Kind | Self::Status | Self::Description => FieldKind::Text,
        }
    }

    fn filterable(self) -> bool {
        matches!(self, Self::VehicleId | Self::Kind | Self::Severity | Self::Status)
    }
}

impl Record for AnomalyReport {
    type Field = AnomalyField;

    const SEARCH_FIELDS: &'static [AnomalyField] = &[AnomalyField::Id, AnomalyField::VehicleId, AnomalyField::Description];
    const DEFAULT_SORT: AnomalyField = AnomalyField::Severity;

    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, field: AnomalyField) -> FieldValue<'_> {
        match field {
            AnomalyField::Id => FieldValue::text(&self.id),
            AnomalyField::VehicleId => FieldValue::text(&self.vehicle_id),
            AnomalyField::Kind => FieldValue::text(self.kind.as_str()),
            AnomalyField::Severity => FieldValue::Number(f64::from(self.severity)),
            AnomalyField::Status => FieldValue::text(self.status.as_str()),
            AnomalyField::Description => FieldValue::text(&self.description),
            #[allow(clippy::cast_precision_loss)]
            AnomalyField::DetectedAt => FieldValue::Number(self.detected_at as f64),
            AnomalyField::Confidence => FieldValue::Number(self.confidence),
        }
    }
}

#[cfg(test)]
#[path = "anomaly_test.rs"]
mod tests;

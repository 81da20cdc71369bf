//! Minimal record type shared by the unit tests.

use std::borrow::Cow;

use crate::record::{Field, FieldKind, FieldValue, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleField {
    Id,
    Severity,
    Status,
    Note,
}

impl Field for SampleField {
    const ALL: &'static [Self] = &[Self::Id, Self::Severity, Self::Status, Self::Note];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Severity => "severity",
            Self::Status => "status",
            Self::Note => "note",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Severity => FieldKind::Numeric,
            Self::Id | Self::Status | Self::Note => FieldKind::Text,
        }
    }

    fn filterable(self) -> bool {
        !matches!(self, Self::Note)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub id: String,
    pub severity: f64,
    pub status: String,
    pub note: String,
}

impl Record for Sample {
    type Field = SampleField;

    const SEARCH_FIELDS: &'static [SampleField] = &[SampleField::Id, SampleField::Note];
    const DEFAULT_SORT: SampleField = SampleField::Severity;

    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self, field: SampleField) -> FieldValue<'_> {
        match field {
            SampleField::Id => FieldValue::text(&self.id),
            SampleField::Severity => FieldValue::Number(self.severity),
            SampleField::Status => FieldValue::Text(Cow::Borrowed(&self.status)),
            SampleField::Note => FieldValue::text(&self.note),
        }
    }
}

pub fn sample(id: &str, severity: f64, status: &str, note: &str) -> Sample {
    Sample { id: id.to_owned(), severity, status: status.to_owned(), note: note.to_owned() }
}

/// `[{A,9},{B,5},{C,7}]`, all open.
pub fn abc() -> Vec<Sample> {
    vec![sample("A", 9.0, "open", "coolant leak"), sample("B", 5.0, "open", "late arrival"), sample("C", 7.0, "open", "tire wear")]
}

pub fn ids(rows: &[Sample]) -> Vec<&str> {
    rows.iter().map(|row| row.id.as_str()).collect()
}

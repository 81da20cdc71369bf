//! Typed field access for flat records.
//!
//! DESIGN
//! ======
//! Views never look fields up by string at derivation time. Each record type
//! names its columns with a small `Copy` enum implementing [`Field`], and
//! [`Record::value`] maps a column to a [`FieldValue`]. String names only
//! appear at the edge, where [`Field::parse`] turns request input into a
//! column.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::state::SortDirection;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Numeric,
}

/// A column of a record type.
pub trait Field: Copy + Eq + Ord + Debug + Send + Sync + 'static {
    /// Every column, in display order.
    const ALL: &'static [Self];

    /// Wire name used in query strings and page documents.
    fn name(self) -> &'static str;

    fn kind(self) -> FieldKind;

    /// Whether the column accepts an exact-match filter.
    fn filterable(self) -> bool {
        true
    }

    #[must_use]
    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.name() == name)
    }

    /// Direction applied when sorting switches to this column. Numeric
    /// columns show the largest values first.
    fn default_direction(self) -> SortDirection {
        match self.kind() {
            FieldKind::Numeric => SortDirection::Desc,
            FieldKind::Text => SortDirection::Asc,
        }
    }
}

/// One flat, independent item of a view collection.
pub trait Record: Clone + Send + Sync + 'static {
    type Field: Field;

    /// Columns matched by the free-text search box.
    const SEARCH_FIELDS: &'static [Self::Field];

    /// Column a freshly opened view sorts by.
    const DEFAULT_SORT: Self::Field;

    fn id(&self) -> &str;

    fn value(&self, field: Self::Field) -> FieldValue<'_>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue<'a> {
    Text(Cow<'a, str>),
    Number(f64),
}

impl<'a> FieldValue<'a> {
    #[must_use]
    pub fn text(value: &'a str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Number(_) => None,
        }
    }

    /// Exact equality against a filter value as received from a client.
    /// Numeric columns compare the parsed number, so `"7"` matches `7.0`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches_exact(&self, expected: &str) -> bool {
        match self {
            Self::Text(text) => text.as_ref() == expected,
            Self::Number(number) => expected.trim().parse::<f64>().is_ok_and(|parsed| parsed == *number),
        }
    }

    /// Ascending order between two values of the same column.
    #[must_use]
    pub fn compare(&self, other: &FieldValue<'_>) -> Ordering {
        match (self, other) {
            (Self::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (Self::Text(a), FieldValue::Text(b)) => locale_cmp(a, b),
            (Self::Number(_), FieldValue::Text(_)) => Ordering::Less,
            (Self::Text(_), FieldValue::Number(_)) => Ordering::Greater,
        }
    }
}

/// Collation for text columns: accents and case are ignored first, then
/// unaccented letters sort ahead of accented ones, then lowercase ahead of
/// uppercase. This matches browser `localeCompare` for Latin labels.
#[must_use]
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(primary_key(b))
        .then_with(|| lowercase(a).cmp(lowercase(b)))
        .then_with(|| b.cmp(a))
}

fn primary_key(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase).map(strip_diacritic)
}

fn lowercase(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

/// Base letter of a lowercase Latin-1 or Latin Extended-A character.
/// Anything else passes through unchanged.
fn strip_diacritic(ch: char) -> char {
    match ch {
        'à'..='å' | 'ā' | 'ă' | 'ą' | 'æ' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ł' | 'ľ' | 'ĺ' | 'ļ' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' | 'œ' => 'o',
        'ŕ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' => 't',
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        _ => ch,
    }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;

//! Search, filter, sort and paginate views over flat in-memory collections.
//!
//! This crate is transport agnostic: the server wraps a [`TableView`] per
//! open view session and serializes [`DerivedView`] pages, while tests and
//! other callers can drive the same state directly.

mod derive;
mod record;
mod state;
mod view;

#[cfg(test)]
mod test_support;

pub use derive::{DerivedView, compare_by, derive_view, matched_sorted, matches_filters, matches_search, total_pages};
pub use record::{Field, FieldKind, FieldValue, Record, locale_cmp};
pub use state::{ALL, FilterValue, Filters, SortDirection, SortSpec, ViewCommand, ViewState};
pub use view::{DataSource, RefreshError, RefreshTicket, SourceError, StaticSource, TableView, now_ms};

//! Pure derivation of a page from items and view state.
//!
//! DESIGN
//! ======
//! Nothing here is cached. Every read filters, sorts and slices the full
//! collection again; collections are tens to low hundreds of rows and a
//! fresh pass can never disagree with the state it was derived from.
//!
//! The sort is stable (`slice::sort_by`), and descending order reverses the
//! comparator rather than the output, so rows with equal keys keep their
//! source order in both directions.

use std::cmp::Ordering;

use serde::Serialize;

use crate::record::{FieldValue, Record};
use crate::state::{Filters, SortSpec, ViewState};

/// One page of a view, plus the counts needed to render page controls.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DerivedView<T> {
    pub rows: Vec<T>,
    pub page_index: usize,
    pub page_size: usize,
    pub total_pages: usize,
    /// Items left after search and filters.
    pub total_matched: usize,
    /// Items in the collection before search and filters.
    pub total_items: usize,
}

impl<T> DerivedView<T> {
    /// The "no results" state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_matched == 0
    }
}

/// Case-insensitive substring match against the record's search columns.
/// Numeric columns never match free text.
#[must_use]
pub fn matches_search<T: Record>(item: &T, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    T::SEARCH_FIELDS.iter().any(|&field| match item.value(field) {
        FieldValue::Text(text) => text.to_lowercase().contains(&needle),
        FieldValue::Number(_) => false,
    })
}

#[must_use]
pub fn matches_filters<T: Record>(item: &T, filters: &Filters<T::Field>) -> bool {
    filters.constraints().all(|(field, expected)| item.value(field).matches_exact(expected))
}

#[must_use]
pub fn compare_by<T: Record>(a: &T, b: &T, sort: SortSpec<T::Field>) -> Ordering {
    sort.direction.apply(a.value(sort.field).compare(&b.value(sort.field)))
}

/// `ceil(matched / page_size)`, never below one.
#[must_use]
pub fn total_pages(matched: usize, page_size: usize) -> usize {
    matched.div_ceil(page_size.max(1)).max(1)
}

/// Every matching item in display order, before paging.
#[must_use]
pub fn matched_sorted<'a, T: Record>(items: &'a [T], state: &ViewState<T::Field>) -> Vec<&'a T> {
    let mut matched: Vec<&T> = items
        .iter()
        .filter(|item| matches_search(*item, state.search()) && matches_filters(*item, state.filters()))
        .collect();
    let sort = state.sort();
    matched.sort_by(|a, b| compare_by(*a, *b, sort));
    matched
}

/// Derive the page described by `state`. An out-of-range page index is
/// clamped to the last page.
#[must_use]
pub fn derive_view<T: Record>(items: &[T], state: &ViewState<T::Field>) -> DerivedView<T> {
    let sorted = matched_sorted(items, state);
    let page_size = state.page_size().max(1);
    let total_pages = total_pages(sorted.len(), page_size);
    let page_index = state.page_index().clamp(1, total_pages);
    let start = (page_index - 1) * page_size;

    let rows = sorted.iter().skip(start).take(page_size).map(|item| (*item).clone()).collect();

    DerivedView { rows, page_index, page_size, total_pages, total_matched: sorted.len(), total_items: items.len() }
}

#[cfg(test)]
#[path = "derive_test.rs"]
mod tests;

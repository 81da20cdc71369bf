//! View state: search term, filters, sort and page window.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::Field;

/// Filter sentinel meaning "no constraint on this column".
pub const ALL: &str = "all";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Orient an ascending comparison.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortSpec<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: Field> SortSpec<F> {
    /// Sort by `field` in its default direction.
    #[must_use]
    pub fn new(field: F) -> Self {
        Self { field, direction: field.default_direction() }
    }

    #[must_use]
    pub fn with_direction(field: F, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Header-click semantics: the active column flips direction, any other
    /// column becomes active in its default direction.
    pub fn select(&mut self, field: F) {
        if self.field == field {
            self.direction = self.direction.toggled();
        } else {
            *self = Self::new(field);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    All,
    Exact(String),
}

impl FilterValue {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw == ALL { Self::All } else { Self::Exact(raw.to_owned()) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL,
            Self::Exact(value) => value,
        }
    }
}

/// Active column filters. Columns never set behave like [`FilterValue::All`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filters<F: Ord> {
    entries: BTreeMap<F, FilterValue>,
}

impl<F: Ord> Default for Filters<F> {
    fn default() -> Self {
        Self { entries: BTreeMap::new() }
    }
}

impl<F: Field> Filters<F> {
    pub fn set(&mut self, field: F, value: FilterValue) {
        self.entries.insert(field, value);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn get(&self, field: F) -> Option<&FilterValue> {
        self.entries.get(&field)
    }

    /// Filters that actually constrain the collection.
    pub fn constraints(&self) -> impl Iterator<Item = (F, &str)> {
        self.entries.iter().filter_map(|(field, value)| match value {
            FilterValue::All => None,
            FilterValue::Exact(expected) => Some((*field, expected.as_str())),
        })
    }

    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.constraints().next().is_none()
    }

    /// Every filter that has been set, `"all"` included, keyed by wire name.
    #[must_use]
    pub fn to_wire(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(field, value)| (field.name().to_owned(), value.as_str().to_owned()))
            .collect()
    }
}

/// A single user interaction against a view.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewCommand<F> {
    Search(String),
    Filter(F, FilterValue),
    ClearFilters,
    Sort(F),
    Page(usize),
    PageSize(usize),
}

/// Everything besides the items that determines a derived page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewState<F: Ord> {
    search: String,
    filters: Filters<F>,
    sort: SortSpec<F>,
    page_index: usize,
    page_size: usize,
}

impl<F: Field> ViewState<F> {
    #[must_use]
    pub fn new(sort: SortSpec<F>, page_size: usize) -> Self {
        Self { search: String::new(), filters: Filters::default(), sort, page_index: 1, page_size: page_size.max(1) }
    }

    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.set_search(term);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, field: F, value: FilterValue) -> Self {
        self.set_filter(field, value);
        self
    }

    #[must_use]
    pub fn with_page(mut self, page_index: usize) -> Self {
        self.page_index = page_index.max(1);
        self
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub fn filters(&self) -> &Filters<F> {
        &self.filters
    }

    #[must_use]
    pub fn sort(&self) -> SortSpec<F> {
        self.sort
    }

    /// Requested page, which may exceed the page count of the current
    /// result; derivation clamps it.
    #[must_use]
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.page_index = 1;
    }

    pub fn set_filter(&mut self, field: F, value: FilterValue) {
        self.filters.set(field, value);
        self.page_index = 1;
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.page_index = 1;
    }

    /// Sorting keeps the current page.
    pub fn set_sort(&mut self, field: F) {
        self.sort.select(field);
    }

    pub fn set_sort_spec(&mut self, sort: SortSpec<F>) {
        self.sort = sort;
    }

    /// Clamp `page_index` into `[1, total_pages]`.
    pub fn set_page_index(&mut self, page_index: usize, total_pages: usize) {
        self.page_index = page_index.clamp(1, total_pages.max(1));
    }

    /// A zero page size is treated as one.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page_index = 1;
    }

    /// Back to an unsearched, unfiltered first page. Sort is kept.
    pub fn reset_query(&mut self) {
        self.search.clear();
        self.filters.clear();
        self.page_index = 1;
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

//! Stateful view: one owned collection plus its view state.
//!
//! DESIGN
//! ======
//! `TableView` applies user operations to its [`ViewState`] and derives the
//! current page on demand. Refresh is split into `begin_refresh` and
//! `complete_refresh` so a caller that stores views behind a lock can fetch
//! without holding it. At most one refresh is in flight per view; a second
//! `begin_refresh` is refused rather than queued.
//!
//! ERROR HANDLING
//! ==============
//! A failed fetch never clears the collection. The last good items stay in
//! place, search and filters are left as they were, and a notice is kept on
//! the view until the next successful refresh.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::derive::{DerivedView, derive_view, matched_sorted, total_pages};
use crate::record::Record;
use crate::state::{FilterValue, ViewCommand, ViewState};

// =============================================================================
// DATA SOURCES
// =============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),
    #[error("data source returned malformed records: {0}")]
    Malformed(String),
}

/// Supplier of the full current collection. Search, filters and paging are
/// never pushed down; the view always receives everything.
#[async_trait::async_trait]
pub trait DataSource<T: Send + 'static>: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Fetch the full current collection.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the backing store cannot be read.
    async fn fetch(&self) -> Result<Vec<T>, SourceError>;
}

/// A fixed collection handed out as a fresh copy on every fetch.
#[derive(Debug, Clone)]
pub struct StaticSource<T> {
    name: String,
    items: Vec<T>,
}

impl<T> StaticSource<T> {
    #[must_use]
    pub fn new(name: impl Into<String>, items: Vec<T>) -> Self {
        Self { name: name.into(), items }
    }
}

#[async_trait::async_trait]
impl<T: Clone + Send + Sync + 'static> DataSource<T> for StaticSource<T> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<T>, SourceError> {
        Ok(self.items.clone())
    }
}

// =============================================================================
// REFRESH
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("a refresh is already in flight")]
    InFlight,
    #[error("refresh ticket {ticket} does not match generation {current}")]
    StaleTicket { ticket: u64, current: u64 },
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Proof that a refresh was started; consumed by [`TableView::complete_refresh`].
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct RefreshTicket {
    generation: u64,
}

impl RefreshTicket {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// =============================================================================
// TABLE VIEW
// =============================================================================

#[derive(Debug, Clone)]
pub struct TableView<T: Record> {
    items: Vec<T>,
    state: ViewState<T::Field>,
    notice: Option<String>,
    refresh_in_flight: bool,
    generation: u64,
    refreshed_at_ms: i64,
}

impl<T: Record> TableView<T> {
    #[must_use]
    pub fn new(items: Vec<T>, state: ViewState<T::Field>) -> Self {
        Self { items, state, notice: None, refresh_in_flight: false, generation: 0, refreshed_at_ms: now_ms() }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn state(&self) -> &ViewState<T::Field> {
        &self.state
    }

    /// User-visible message left by the last failed refresh.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refresh_in_flight
    }

    /// Unix milliseconds of the last successful load.
    #[must_use]
    pub fn refreshed_at_ms(&self) -> i64 {
        self.refreshed_at_ms
    }

    #[must_use]
    pub fn derive(&self) -> DerivedView<T> {
        derive_view(&self.items, &self.state)
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        total_pages(matched_sorted(&self.items, &self.state).len(), self.state.page_size())
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.state.set_search(term);
    }

    pub fn set_filter(&mut self, field: T::Field, value: FilterValue) {
        self.state.set_filter(field, value);
    }

    pub fn clear_filters(&mut self) {
        self.state.clear_filters();
    }

    pub fn set_sort(&mut self, field: T::Field) {
        self.state.set_sort(field);
    }

    pub fn set_page_index(&mut self, page_index: usize) {
        let total = self.total_pages();
        self.state.set_page_index(page_index, total);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.state.set_page_size(page_size);
    }

    pub fn apply(&mut self, command: ViewCommand<T::Field>) {
        match command {
            ViewCommand::Search(term) => self.set_search_term(term),
            ViewCommand::Filter(field, value) => self.set_filter(field, value),
            ViewCommand::ClearFilters => self.clear_filters(),
            ViewCommand::Sort(field) => self.set_sort(field),
            ViewCommand::Page(page_index) => self.set_page_index(page_index),
            ViewCommand::PageSize(page_size) => self.set_page_size(page_size),
        }
    }

    /// Mark a refresh as started.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::InFlight`] if a refresh has not completed yet.
    pub fn begin_refresh(&mut self) -> Result<RefreshTicket, RefreshError> {
        if self.refresh_in_flight {
            return Err(RefreshError::InFlight);
        }
        self.refresh_in_flight = true;
        self.generation += 1;
        Ok(RefreshTicket { generation: self.generation })
    }

    /// Apply the outcome of a fetch started with [`Self::begin_refresh`].
    /// On success the collection is replaced and search and filters are
    /// cleared; on failure the current collection is kept and a notice set.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::StaleTicket`] for a ticket from another
    /// generation and [`RefreshError::Source`] when the fetch failed.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        outcome: Result<Vec<T>, SourceError>,
    ) -> Result<usize, RefreshError> {
        if !self.refresh_in_flight || ticket.generation != self.generation {
            return Err(RefreshError::StaleTicket { ticket: ticket.generation, current: self.generation });
        }
        self.refresh_in_flight = false;

        match outcome {
            Ok(items) => {
                let count = items.len();
                self.items = items;
                self.state.reset_query();
                self.notice = None;
                self.refreshed_at_ms = now_ms();
                Ok(count)
            }
            Err(err) => {
                self.notice = Some(format!("refresh failed, showing previously loaded data ({err})"));
                Err(RefreshError::Source(err))
            }
        }
    }

    /// Fetch from `source` and replace the collection.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_refresh`] and [`Self::complete_refresh`].
    pub async fn refresh(&mut self, source: &dyn DataSource<T>) -> Result<usize, RefreshError> {
        if self.refresh_in_flight {
            return Err(RefreshError::InFlight);
        }
        // The exclusive borrow already rules out a concurrent refresh; the
        // ticket is only taken once the fetch resolved so a dropped future
        // leaves the view untouched.
        let outcome = source.fetch().await;
        let ticket = self.begin_refresh()?;
        self.complete_refresh(ticket, outcome)
    }

    /// Release a started refresh whose fetch never produced an outcome,
    /// identified by its ticket generation.
    pub fn abandon_refresh(&mut self, generation: u64) {
        if self.refresh_in_flight && generation == self.generation {
            self.refresh_in_flight = false;
        }
    }
}

/// Current wall-clock time in Unix milliseconds, as stamped on refreshes.
#[must_use]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;

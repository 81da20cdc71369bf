//! View sessions: open, operate, refresh and close table views.
//!
//! DESIGN
//! ======
//! Each open view is a `TableView` owned by exactly one session, kept in an
//! in-memory map keyed by view id (one registry per dataset). Sessions end
//! when the client closes them or when the idle sweeper evicts them; nothing
//! is persisted.
//!
//! Refresh fetches from the dataset source without holding the registry
//! lock. The fetch and the hand-back run in a spawned task so a dropped HTTP
//! request cannot leave a view stuck in the refreshing state.
//!
//! ERROR HANDLING
//! ==============
//! A failing source during refresh is not an error for the caller: the view
//! keeps its last good items and the returned snapshot carries the notice.
//! Only opening a view needs a successful first fetch. Every fetch is
//! bounded by `fetch_timeout`; a source that never answers counts as
//! unavailable, so a hung refresh cannot pin a session.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tableview::{
    DataSource, DerivedView, Field, Record, RefreshError, SortDirection, SortSpec, SourceError, TableView, ViewCommand,
    ViewState, derive_view, now_ms,
};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ViewConfig;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("view not found: {0}")]
    NotFound(Uuid),
    #[error("view capacity reached ({0} open views)")]
    Capacity(usize),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field is not filterable: {0}")]
    NotFilterable(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("a refresh is already in flight for view {0}")]
    RefreshInFlight(Uuid),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Serialized state of one view: the current page plus the inputs that
/// produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_id: Option<Uuid>,
    #[serde(flatten)]
    pub page: DerivedView<T>,
    pub empty: bool,
    pub search: String,
    pub filters: BTreeMap<String, String>,
    pub sort_field: &'static str,
    pub sort_direction: SortDirection,
    pub notice: Option<String>,
    pub refreshing: bool,
    pub refreshed_at: i64,
}

impl<T: Record> ViewSnapshot<T> {
    #[must_use]
    pub fn of_view(view_id: Uuid, view: &TableView<T>) -> Self {
        let mut snapshot = Self::of_state(view.derive(), view.state(), view.refreshed_at_ms());
        snapshot.view_id = Some(view_id);
        snapshot.notice = view.notice().map(str::to_owned);
        snapshot.refreshing = view.is_refreshing();
        snapshot
    }

    fn of_state(page: DerivedView<T>, state: &ViewState<T::Field>, refreshed_at: i64) -> Self {
        let sort = state.sort();
        Self {
            view_id: None,
            empty: page.is_empty(),
            page,
            search: state.search().to_owned(),
            filters: state.filters().to_wire(),
            sort_field: sort.field.name(),
            sort_direction: sort.direction,
            notice: None,
            refreshing: false,
            refreshed_at,
        }
    }
}

pub struct ViewSession<T: Record> {
    pub view: TableView<T>,
    pub last_touched: Instant,
}

impl<T: Record> ViewSession<T> {
    fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

// =============================================================================
// FIELD PARSING
// =============================================================================

/// Resolve a wire column name for sorting.
///
/// # Errors
///
/// Returns [`ViewError::UnknownField`] for a name the record does not have.
pub fn parse_field<F: Field>(name: &str) -> Result<F, ViewError> {
    F::parse(name).ok_or_else(|| ViewError::UnknownField(name.to_owned()))
}

/// Resolve a wire column name for an exact-match filter.
///
/// # Errors
///
/// Returns [`ViewError::UnknownField`] or [`ViewError::NotFilterable`].
pub fn parse_filter_field<F: Field>(name: &str) -> Result<F, ViewError> {
    let field = parse_field::<F>(name)?;
    if field.filterable() { Ok(field) } else { Err(ViewError::NotFilterable(name.to_owned())) }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Open views of one dataset plus the source they load from.
pub struct ViewRegistry<T: Record> {
    sessions: Arc<RwLock<HashMap<Uuid, ViewSession<T>>>>,
    source: Arc<dyn DataSource<T>>,
    config: ViewConfig,
}

impl<T: Record> Clone for ViewRegistry<T> {
    fn clone(&self) -> Self {
        Self { sessions: Arc::clone(&self.sessions), source: Arc::clone(&self.source), config: self.config }
    }
}

impl<T: Record> ViewRegistry<T> {
    #[must_use]
    pub fn new(source: Arc<dyn DataSource<T>>, config: ViewConfig) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), source, config }
    }

    #[must_use]
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Fetch the full collection, giving up after `fetch_timeout`.
    async fn fetch(&self) -> Result<Vec<T>, SourceError> {
        let limit = self.config.fetch_timeout;
        match tokio::time::timeout(limit, self.source.fetch()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SourceError::Unavailable(format!(
                "{} did not answer within {}ms",
                self.source.name(),
                limit.as_millis()
            ))),
        }
    }

    /// Fresh, unsearched first page in the dataset's default sort.
    #[must_use]
    pub fn default_state(&self) -> ViewState<T::Field> {
        ViewState::new(SortSpec::new(T::DEFAULT_SORT), self.config.clamp_page_size(self.config.default_page_size))
    }

    /// Derive one page without opening a session.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Source`] if the source cannot be read.
    pub async fn query(&self, state: ViewState<T::Field>) -> Result<ViewSnapshot<T>, ViewError> {
        let items = self.fetch().await?;
        Ok(ViewSnapshot::of_state(derive_view(&items, &state), &state, now_ms()))
    }

    /// Open a view session loaded with the full current collection.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Capacity`] when the session limit is reached and
    /// [`ViewError::Source`] when the first fetch fails.
    pub async fn open(&self) -> Result<ViewSnapshot<T>, ViewError> {
        self.ensure_capacity(self.sessions.read().await.len())?;

        let items = self.fetch().await?;
        let view = TableView::new(items, self.default_state());
        let view_id = Uuid::new_v4();
        let snapshot = ViewSnapshot::of_view(view_id, &view);

        let mut sessions = self.sessions.write().await;
        self.ensure_capacity(sessions.len())?;
        sessions.insert(view_id, ViewSession { view, last_touched: Instant::now() });
        info!(%view_id, source = self.source.name(), items = snapshot.page.total_items, "view opened");

        Ok(snapshot)
    }

    fn ensure_capacity(&self, open: usize) -> Result<(), ViewError> {
        if open >= self.config.max_sessions {
            warn!(open, max = self.config.max_sessions, source = self.source.name(), "view capacity reached");
            return Err(ViewError::Capacity(open));
        }
        Ok(())
    }

    /// Current page of an open view.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::NotFound`] for an unknown or closed view.
    pub async fn snapshot(&self, view_id: Uuid) -> Result<ViewSnapshot<T>, ViewError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&view_id).ok_or(ViewError::NotFound(view_id))?;
        session.touch();
        Ok(ViewSnapshot::of_view(view_id, &session.view))
    }

    /// Apply one user operation and return the re-derived page.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::NotFound`] for an unknown or closed view.
    pub async fn apply(&self, view_id: Uuid, command: ViewCommand<T::Field>) -> Result<ViewSnapshot<T>, ViewError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&view_id).ok_or(ViewError::NotFound(view_id))?;
        debug!(%view_id, ?command, "view command");
        session.view.apply(command);
        session.touch();
        Ok(ViewSnapshot::of_view(view_id, &session.view))
    }

    /// Reload an open view from the source.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::NotFound`] for an unknown view or one closed
    /// while the fetch was running, and [`ViewError::RefreshInFlight`] when
    /// another refresh of the same view has not finished.
    pub async fn refresh(&self, view_id: Uuid) -> Result<ViewSnapshot<T>, ViewError> {
        let ticket = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(&view_id).ok_or(ViewError::NotFound(view_id))?;
            session.touch();
            session.view.begin_refresh().map_err(|_| ViewError::RefreshInFlight(view_id))?
        };

        let registry = self.clone();
        let generation = ticket.generation();
        let task = tokio::spawn(async move {
            let outcome = registry.fetch().await;
            let mut sessions = registry.sessions.write().await;
            let Some(session) = sessions.get_mut(&view_id) else {
                debug!(%view_id, "view closed during refresh; discarding fetch");
                return Err(ViewError::NotFound(view_id));
            };
            match session.view.complete_refresh(ticket, outcome) {
                Ok(items) => info!(%view_id, items, source = registry.source.name(), "view refreshed"),
                Err(RefreshError::Source(err)) => {
                    warn!(%view_id, error = %err, source = registry.source.name(), "view refresh failed; keeping last good items");
                }
                Err(err) => warn!(%view_id, error = %err, "refresh outcome not applied"),
            }
            session.touch();
            Ok(ViewSnapshot::of_view(view_id, &session.view))
        });

        match task.await {
            Ok(result) => result,
            Err(join_err) => {
                warn!(%view_id, generation, error = %join_err, "refresh task failed");
                let mut sessions = self.sessions.write().await;
                if let Some(session) = sessions.get_mut(&view_id) {
                    session.view.abandon_refresh(generation);
                }
                Err(ViewError::Source(SourceError::Unavailable(join_err.to_string())))
            }
        }
    }

    /// Close a view session.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::NotFound`] for an unknown or already closed view.
    pub async fn close(&self, view_id: Uuid) -> Result<(), ViewError> {
        let removed = self.sessions.write().await.remove(&view_id);
        if removed.is_none() {
            return Err(ViewError::NotFound(view_id));
        }
        info!(%view_id, source = self.source.name(), "view closed");
        Ok(())
    }

    /// Evict sessions idle for longer than the configured timeout. Views with
    /// a refresh in flight are kept. Returns the number evicted.
    pub async fn sweep_idle(&self, now: Instant) -> usize {
        let idle_timeout = self.config.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            session.view.is_refreshing() || now.saturating_duration_since(session.last_touched) <= idle_timeout
        });
        before - sessions.len()
    }
}

// =============================================================================
// IDLE SWEEPER
// =============================================================================

/// Spawn the background task that evicts idle view sessions.
pub fn spawn_view_sweeper(state: AppState) -> JoinHandle<()> {
    let interval = state.view_config().sweep_interval;
    info!(interval_secs = interval.as_secs(), "view sweeper configured");
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            sweep_all(&state).await;
        }
    })
}

pub(crate) async fn sweep_all(state: &AppState) -> usize {
    let now = Instant::now();
    let anomalies = state.anomalies.sweep_idle(now).await;
    let performance_logs = state.performance_logs.sweep_idle(now).await;
    let evicted = anomalies + performance_logs;
    if evicted > 0 {
        let open = state.anomalies.len().await + state.performance_logs.len().await;
        info!(anomalies, performance_logs, open, "evicted idle views");
    }
    evicted
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;

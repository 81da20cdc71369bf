//! Table view routes: stateless queries and view session endpoints.
//!
//! Each dataset is served by the same generic handlers; the [`Dataset`]
//! trait binds a record type to its URL segment and its registry.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tableview::{Field, FieldKind, FilterValue, Record, SortDirection, SortSpec, ViewCommand, ViewState};
use tracing::warn;
use uuid::Uuid;

use crate::config::ViewConfig;
use crate::records::{AnomalyReport, PerformanceLog};
use crate::services::views::{self, ViewError, ViewRegistry, ViewSnapshot};
use crate::state::AppState;

/// A record type exposed over HTTP.
pub trait Dataset: Record + Serialize {
    /// URL segment under `/api` and `/api/views`.
    const PATH: &'static str;

    fn registry(state: &AppState) -> &ViewRegistry<Self>;
}

impl Dataset for AnomalyReport {
    const PATH: &'static str = "anomalies";

    fn registry(state: &AppState) -> &ViewRegistry<Self> {
        &state.anomalies
    }
}

impl Dataset for PerformanceLog {
    const PATH: &'static str = "performance-logs";

    fn registry(state: &AppState) -> &ViewRegistry<Self> {
        &state.performance_logs
    }
}

// =============================================================================
// REQUEST BODIES
// =============================================================================

/// One user operation, tagged by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ViewActionBody {
    Search { term: String },
    Filter { field: String, value: String },
    ClearFilters,
    Sort { field: String },
    Page { page: usize },
    PageSize { page_size: usize },
}

impl ViewActionBody {
    fn into_command<F: Field>(self, config: &ViewConfig) -> Result<ViewCommand<F>, ViewError> {
        Ok(match self {
            Self::Search { term } => ViewCommand::Search(term),
            Self::Filter { field, value } => {
                let (field, value) = parse_filter::<F>(&field, &value)?;
                ViewCommand::Filter(field, value)
            }
            Self::ClearFilters => ViewCommand::ClearFilters,
            Self::Sort { field } => ViewCommand::Sort(views::parse_field(&field)?),
            Self::Page { page } => ViewCommand::Page(page),
            Self::PageSize { page_size } => ViewCommand::PageSize(config.clamp_page_size(page_size)),
        })
    }
}

/// Numeric columns only accept numbers or the `all` sentinel.
fn parse_filter<F: Field>(name: &str, raw: &str) -> Result<(F, FilterValue), ViewError> {
    let field = views::parse_filter_field::<F>(name)?;
    let value = FilterValue::parse(raw);
    if let FilterValue::Exact(ref exact) = value {
        if field.kind() == FieldKind::Numeric && exact.trim().parse::<f64>().is_err() {
            return Err(ViewError::InvalidValue { key: name.to_owned(), value: raw.to_owned() });
        }
    }
    Ok((field, value))
}

fn parse_usize(key: &str, raw: &str) -> Result<usize, ViewError> {
    raw.trim()
        .parse()
        .map_err(|_| ViewError::InvalidValue { key: key.to_owned(), value: raw.to_owned() })
}

/// Build a view state from query-string parameters. Keys other than
/// `search`, `sort`, `dir`, `page` and `page_size` name filter columns.
pub(crate) fn state_from_query<T: Dataset>(
    registry: &ViewRegistry<T>,
    params: &HashMap<String, String>,
) -> Result<ViewState<T::Field>, ViewError> {
    let config = registry.config();
    let mut state = registry.default_state();

    let field = match params.get("sort") {
        Some(name) => views::parse_field::<T::Field>(name)?,
        None => T::DEFAULT_SORT,
    };
    let sort = match params.get("dir") {
        Some(raw) => SortDirection::parse(raw)
            .map(|direction| SortSpec::with_direction(field, direction))
            .ok_or_else(|| ViewError::InvalidValue { key: "dir".into(), value: raw.clone() })?,
        None => SortSpec::new(field),
    };
    state.set_sort_spec(sort);

    if let Some(raw) = params.get("page_size") {
        state.set_page_size(config.clamp_page_size(parse_usize("page_size", raw)?));
    }
    if let Some(term) = params.get("search") {
        state.set_search(term.as_str());
    }
    for (key, raw) in params {
        if matches!(key.as_str(), "search" | "sort" | "dir" | "page" | "page_size") {
            continue;
        }
        let (field, value) = parse_filter::<T::Field>(key, raw)?;
        state.set_filter(field, value);
    }
    if let Some(raw) = params.get("page") {
        state = state.with_page(parse_usize("page", raw)?);
    }

    Ok(state)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/{dataset}`: derive one page without opening a session.
pub async fn query<T: Dataset>(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ViewSnapshot<T>>, StatusCode> {
    let registry = T::registry(&state);
    let view_state = state_from_query(registry, &params).map_err(view_error_to_status)?;
    let snapshot = registry.query(view_state).await.map_err(view_error_to_status)?;
    Ok(Json(snapshot))
}

/// `POST /api/views/{dataset}`: open a view session.
pub async fn open_view<T: Dataset>(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ViewSnapshot<T>>), StatusCode> {
    let snapshot = T::registry(&state).open().await.map_err(view_error_to_status)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// `GET /api/views/{dataset}/{id}`: current page of an open view.
pub async fn get_view<T: Dataset>(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<Json<ViewSnapshot<T>>, StatusCode> {
    let snapshot = T::registry(&state).snapshot(view_id).await.map_err(view_error_to_status)?;
    Ok(Json(snapshot))
}

/// `POST /api/views/{dataset}/{id}/actions`: apply one operation.
pub async fn apply_action<T: Dataset>(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
    Json(body): Json<ViewActionBody>,
) -> Result<Json<ViewSnapshot<T>>, StatusCode> {
    let registry = T::registry(&state);
    let command = body.into_command(registry.config()).map_err(view_error_to_status)?;
    let snapshot = registry.apply(view_id, command).await.map_err(view_error_to_status)?;
    Ok(Json(snapshot))
}

/// `POST /api/views/{dataset}/{id}/refresh`: reload from the source.
pub async fn refresh_view<T: Dataset>(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<Json<ViewSnapshot<T>>, StatusCode> {
    let snapshot = T::registry(&state).refresh(view_id).await.map_err(view_error_to_status)?;
    Ok(Json(snapshot))
}

/// `DELETE /api/views/{dataset}/{id}`: close the session.
pub async fn close_view<T: Dataset>(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    T::registry(&state).close(view_id).await.map_err(view_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn view_error_to_status(err: ViewError) -> StatusCode {
    match err {
        ViewError::NotFound(_) => StatusCode::NOT_FOUND,
        ViewError::UnknownField(_) | ViewError::NotFilterable(_) | ViewError::InvalidValue { .. } => {
            StatusCode::BAD_REQUEST
        }
        ViewError::RefreshInFlight(_) => StatusCode::CONFLICT,
        ViewError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
        ViewError::Source(err) => {
            warn!(error = %err, "data source failed");
            StatusCode::BAD_GATEWAY
        }
    }
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;

//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every dataset gets the same set of endpoints: a stateless query at
//! `/api/{dataset}` and view sessions under `/api/views/{dataset}`.

pub mod views;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::records::{AnomalyReport, PerformanceLog};
use crate::state::AppState;
use views::Dataset;

/// Build the full HTTP application.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(dataset_routes::<AnomalyReport>())
        .merge(dataset_routes::<PerformanceLog>())
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn dataset_routes<T: Dataset>() -> Router<AppState> {
    let base = format!("/api/views/{}", T::PATH);
    Router::new()
        .route(&format!("/api/{}", T::PATH), get(views::query::<T>))
        .route(&base, post(views::open_view::<T>))
        .route(&format!("{base}/{{id}}"), get(views::get_view::<T>).delete(views::close_view::<T>))
        .route(&format!("{base}/{{id}}/actions"), post(views::apply_action::<T>))
        .route(&format!("{base}/{{id}}/refresh"), post(views::refresh_view::<T>))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use super::*;
use crate::state::test_helpers;

#[tokio::test]
async fn healthz_is_ok() {
    assert_eq!(healthz().await, StatusCode::OK);
}

#[test]
fn dataset_paths_are_distinct() {
    assert_ne!(AnomalyReport::PATH, PerformanceLog::PATH);
}

#[tokio::test]
async fn app_builds_without_route_conflicts() {
    let _router = app(test_helpers::test_app_state());
}

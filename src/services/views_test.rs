use super::*;
use crate::records::AnomalyStatus;
use crate::records::anomaly::AnomalyField;
use crate::state::test_helpers::{self, FlakySource, GatedSource, abc_source, anomaly};
use std::time::Duration;
use tableview::FilterValue;

fn small_pages() -> ViewConfig {
    ViewConfig { default_page_size: 2, ..ViewConfig::default() }
}

fn row_ids<T: Record>(snapshot: &ViewSnapshot<T>) -> Vec<String> {
    snapshot.page.rows.iter().map(|r| r.id().to_owned()).collect()
}

async fn wait_until_refreshing(registry: &ViewRegistry<crate::records::AnomalyReport>, view_id: Uuid) {
    for _ in 0..200 {
        if registry.snapshot(view_id).await.unwrap().refreshing {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("refresh never started");
}

// =============================================================================
// OPEN / OPERATE
// =============================================================================

#[tokio::test]
async fn open_starts_on_first_page_in_default_sort() {
    let state = test_helpers::test_app_state_with_anomalies(abc_source(), small_pages());
    let snapshot = state.anomalies.open().await.unwrap();

    assert!(snapshot.view_id.is_some());
    assert_eq!(row_ids(&snapshot), vec!["A", "C"]);
    assert_eq!(snapshot.page.total_pages, 2);
    assert_eq!(snapshot.sort_field, "severity");
    assert_eq!(snapshot.sort_direction, SortDirection::Desc);
    assert!(!snapshot.empty);
    assert_eq!(state.anomalies.len().await, 1);
}

#[tokio::test]
async fn commands_rederive_the_page() {
    let state = test_helpers::test_app_state_with_anomalies(abc_source(), small_pages());
    let view_id = state.anomalies.open().await.unwrap().view_id.unwrap();

    let page_two = state.anomalies.apply(view_id, ViewCommand::Page(2)).await.unwrap();
    assert_eq!(row_ids(&page_two), vec!["B"]);

    let searched = state.anomalies.apply(view_id, ViewCommand::Search("b".into())).await.unwrap();
    assert_eq!(searched.page.page_index, 1);
    assert_eq!(row_ids(&searched), vec!["B"]);
    assert_eq!(searched.page.total_pages, 1);

    let cleared = state.anomalies.apply(view_id, ViewCommand::Search(String::new())).await.unwrap();
    let filtered = state
        .anomalies
        .apply(view_id, ViewCommand::Filter(AnomalyField::Status, FilterValue::parse("all")))
        .await
        .unwrap();
    assert_eq!(row_ids(&cleared), row_ids(&filtered));
    assert_eq!(filtered.filters.get("status").map(String::as_str), Some("all"));

    let open_only = state
        .anomalies
        .apply(view_id, ViewCommand::Filter(AnomalyField::Status, FilterValue::parse("open")))
        .await
        .unwrap();
    assert_eq!(row_ids(&open_only), vec!["A", "C"]);
}

#[tokio::test]
async fn out_of_range_page_is_clamped() {
    let state = test_helpers::test_app_state_with_anomalies(abc_source(), small_pages());
    let view_id = state.anomalies.open().await.unwrap().view_id.unwrap();

    let snapshot = state.anomalies.apply(view_id, ViewCommand::Page(50)).await.unwrap();
    assert_eq!(snapshot.page.page_index, 2);
}

#[tokio::test]
async fn unknown_view_is_not_found() {
    let state = test_helpers::test_app_state();
    let missing = Uuid::new_v4();
    assert!(matches!(state.anomalies.snapshot(missing).await, Err(ViewError::NotFound(id)) if id == missing));
    assert!(matches!(state.anomalies.apply(missing, ViewCommand::Page(1)).await, Err(ViewError::NotFound(_))));
    assert!(matches!(state.anomalies.close(missing).await, Err(ViewError::NotFound(_))));
}

#[tokio::test]
async fn close_ends_the_session() {
    let state = test_helpers::test_app_state();
    let view_id = state.performance_logs.open().await.unwrap().view_id.unwrap();
    state.performance_logs.close(view_id).await.unwrap();
    assert!(matches!(state.performance_logs.snapshot(view_id).await, Err(ViewError::NotFound(_))));
    assert_eq!(state.performance_logs.len().await, 0);
}

#[tokio::test]
async fn capacity_limit_rejects_new_views() {
    let config = ViewConfig { max_sessions: 1, ..ViewConfig::default() };
    let state = test_helpers::test_app_state_with_config(config);
    state.anomalies.open().await.unwrap();
    assert!(matches!(state.anomalies.open().await, Err(ViewError::Capacity(1))));
    // Limits are per dataset.
    assert!(state.performance_logs.open().await.is_ok());
}

#[tokio::test]
async fn open_fails_when_source_is_down() {
    let source = Arc::new(FlakySource::new(Vec::new()));
    source.set_healthy(false);
    let state = test_helpers::test_app_state_with_anomalies(source, ViewConfig::default());
    assert!(matches!(state.anomalies.open().await, Err(ViewError::Source(_))));
    assert_eq!(state.anomalies.len().await, 0);
}

// =============================================================================
// REFRESH
// =============================================================================

#[tokio::test]
async fn refresh_replaces_items_and_clears_search() {
    let state = test_helpers::test_app_state_with_anomalies(abc_source(), small_pages());
    let view_id = state.anomalies.open().await.unwrap().view_id.unwrap();
    state.anomalies.apply(view_id, ViewCommand::Search("A".into())).await.unwrap();
    state.anomalies.apply(view_id, ViewCommand::Sort(AnomalyField::Id)).await.unwrap();

    let snapshot = state.anomalies.refresh(view_id).await.unwrap();
    assert_eq!(snapshot.search, "");
    assert_eq!(snapshot.sort_field, "id");
    assert_eq!(snapshot.page.total_matched, 3);
    assert!(snapshot.notice.is_none());
    assert!(!snapshot.refreshing);
}

#[tokio::test]
async fn failed_refresh_keeps_last_good_items() {
    let source = Arc::new(FlakySource::new(vec![anomaly("A", 9, AnomalyStatus::Open), anomaly("B", 4, AnomalyStatus::Open)]));
    let state = test_helpers::test_app_state_with_anomalies(source.clone(), ViewConfig::default());
    let view_id = state.anomalies.open().await.unwrap().view_id.unwrap();
    state.anomalies.apply(view_id, ViewCommand::Search("B".into())).await.unwrap();

    source.set_healthy(false);
    let snapshot = state.anomalies.refresh(view_id).await.unwrap();
    assert_eq!(snapshot.page.total_items, 2);
    assert_eq!(snapshot.search, "B");
    assert!(snapshot.notice.as_deref().is_some_and(|n| n.contains("upstream timed out")));

    source.set_healthy(true);
    let recovered = state.anomalies.refresh(view_id).await.unwrap();
    assert!(recovered.notice.is_none());
}

#[tokio::test]
async fn concurrent_refresh_is_refused() {
    let source = Arc::new(GatedSource::new(vec![anomaly("A", 9, AnomalyStatus::Open)]));
    let state = test_helpers::test_app_state_with_anomalies(source.clone(), ViewConfig::default());

    source.release_one();
    let view_id = state.anomalies.open().await.unwrap().view_id.unwrap();

    let registry = state.anomalies.clone();
    let first = tokio::spawn(async move { registry.refresh(view_id).await });
    wait_until_refreshing(&state.anomalies, view_id).await;

    assert!(matches!(state.anomalies.refresh(view_id).await, Err(ViewError::RefreshInFlight(id)) if id == view_id));

    source.release_one();
    let snapshot = first.await.unwrap().unwrap();
    assert!(!snapshot.refreshing);

    // The slot is free again once the first refresh lands.
    let pending = {
        let registry = state.anomalies.clone();
        tokio::spawn(async move { registry.refresh(view_id).await })
    };
    source.release_one();
    assert!(pending.await.unwrap().is_ok());
}

#[tokio::test]
async fn hung_refresh_times_out_and_frees_the_view() {
    let config = ViewConfig { fetch_timeout: Duration::from_millis(50), ..ViewConfig::default() };
    let source = Arc::new(GatedSource::new(vec![anomaly("A", 9, AnomalyStatus::Open)]));
    let state = test_helpers::test_app_state_with_anomalies(source.clone(), config);

    source.release_one();
    let view_id = state.anomalies.open().await.unwrap().view_id.unwrap();

    // The gate is never opened again, so this fetch hangs until the timeout.
    let snapshot = state.anomalies.refresh(view_id).await.unwrap();
    assert!(!snapshot.refreshing);
    assert_eq!(snapshot.page.total_items, 1);
    assert!(snapshot.notice.as_deref().is_some_and(|n| n.contains("did not answer")));

    let idle_later = Instant::now() + config.idle_timeout + Duration::from_secs(1);
    assert_eq!(state.anomalies.sweep_idle(idle_later).await, 1);
}

#[tokio::test]
async fn hung_source_fails_open_after_timeout() {
    let config = ViewConfig { fetch_timeout: Duration::from_millis(50), ..ViewConfig::default() };
    let source = Arc::new(GatedSource::new(Vec::new()));
    let state = test_helpers::test_app_state_with_anomalies(source, config);

    let err = state.anomalies.open().await.unwrap_err();
    assert!(matches!(err, ViewError::Source(SourceError::Unavailable(_))));
    assert_eq!(state.anomalies.len().await, 0);
}

#[tokio::test]
async fn view_closed_during_refresh_discards_fetch() {
    let source = Arc::new(GatedSource::new(vec![anomaly("A", 9, AnomalyStatus::Open)]));
    let state = test_helpers::test_app_state_with_anomalies(source.clone(), ViewConfig::default());

    source.release_one();
    let view_id = state.anomalies.open().await.unwrap().view_id.unwrap();

    let registry = state.anomalies.clone();
    let pending = tokio::spawn(async move { registry.refresh(view_id).await });
    wait_until_refreshing(&state.anomalies, view_id).await;

    state.anomalies.close(view_id).await.unwrap();
    source.release_one();
    assert!(matches!(pending.await.unwrap(), Err(ViewError::NotFound(_))));
}

// =============================================================================
// QUERY / SWEEP / PARSING
// =============================================================================

#[tokio::test]
async fn query_derives_without_a_session() {
    let state = test_helpers::test_app_state_with_anomalies(abc_source(), small_pages());
    let snapshot = state.anomalies.query(state.anomalies.default_state().with_search("C")).await.unwrap();
    assert!(snapshot.view_id.is_none());
    assert_eq!(row_ids(&snapshot), vec!["C"]);
    assert_eq!(state.anomalies.len().await, 0);
}

#[tokio::test]
async fn sweep_evicts_only_idle_sessions() {
    let config = ViewConfig { idle_timeout: Duration::from_secs(60), ..ViewConfig::default() };
    let state = test_helpers::test_app_state_with_config(config);
    state.anomalies.open().await.unwrap();
    state.performance_logs.open().await.unwrap();

    assert_eq!(state.anomalies.sweep_idle(Instant::now()).await, 0);
    assert_eq!(state.anomalies.sweep_idle(Instant::now() + Duration::from_secs(61)).await, 1);
    assert_eq!(state.anomalies.len().await, 0);
    assert_eq!(state.performance_logs.len().await, 1);
}

#[tokio::test]
async fn sweep_all_covers_every_dataset() {
    let config = ViewConfig { idle_timeout: Duration::ZERO, ..ViewConfig::default() };
    let state = test_helpers::test_app_state_with_config(config);
    state.anomalies.open().await.unwrap();
    state.performance_logs.open().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(sweep_all(&state).await, 2);
}

#[test]
fn parse_filter_field_checks_filterability() {
    assert_eq!(parse_filter_field::<AnomalyField>("status").unwrap(), AnomalyField::Status);
    assert!(matches!(parse_filter_field::<AnomalyField>("description"), Err(ViewError::NotFilterable(_))));
    assert!(matches!(parse_field::<AnomalyField>("colour"), Err(ViewError::UnknownField(_))));
}

#[test]
fn snapshot_serializes_flat_page() {
    let view = TableView::new(vec![anomaly("A", 9, AnomalyStatus::Open)], ViewState::new(SortSpec::new(AnomalyField::Severity), 5));
    let snapshot = ViewSnapshot::of_view(Uuid::nil(), &view);
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["page_index"], 1);
    assert_eq!(json["total_pages"], 1);
    assert_eq!(json["sort_direction"], "desc");
    assert_eq!(json["rows"][0]["id"], "A");
    assert_eq!(json["empty"], false);
    assert!(json["notice"].is_null());
}

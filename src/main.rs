mod config;
mod db;
mod records;
mod routes;
mod services;
mod sources;
mod state;

use sources::Sources;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid configuration");

    let sources = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = db::init_pool(database_url, config.db_max_connections)
                .await
                .expect("database init failed");
            Sources::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; serving bundled fixtures");
            Sources::fixtures().expect("bundled fixtures failed to parse")
        }
    };
    let state = state::AppState::new(sources, config.views);
    tracing::info!(
        anomalies = state.anomalies.source_name(),
        performance_logs = state.performance_logs.source_name(),
        "view sources ready"
    );

    // Spawn background idle-view sweeper.
    let _sweeper = services::views::spawn_view_sweeper(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "fleetdash listening");
    axum::serve(listener, app).await.expect("server failed");
}

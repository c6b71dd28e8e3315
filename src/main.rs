// Main entry point - Dependency injection and server setup
use std::sync::Arc;
use axum::{
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use metric_dashboard::application::dashboard_service::DashboardService;
use metric_dashboard::application::key_value_store::KeyValueStore;
use metric_dashboard::application::live_chart_service::LiveChartService;
use metric_dashboard::application::report_service::ReportService;
use metric_dashboard::infrastructure::config::load_app_config;
use metric_dashboard::infrastructure::sled_store::SledStore;
use metric_dashboard::infrastructure::memory_store::MemoryStore;
use metric_dashboard::presentation::app_state::AppState;
use metric_dashboard::presentation::handlers::{
    close_chart, export_report, get_chart, get_dashboard, get_report, health_check,
    list_datasets, put_chart_mode, stream_chart,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Durable chart data, plus mode preferences that only live as long as the process
    let durable = SledStore::open(&config.storage.path)?;
    let store: Arc<dyn KeyValueStore> = Arc::new(durable.clone());
    let session: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    // Create services (application layer)
    let live_charts = Arc::new(LiveChartService::new(
        store.clone(),
        session,
        config.chart.tick_interval(),
    ));
    let report_service = ReportService::new(store.clone());
    report_service.log_inventory();

    // Create application state
    let state = Arc::new(AppState {
        dashboard_service: DashboardService::new(live_charts.clone()),
        live_charts: live_charts.clone(),
        report_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/metrics", get(get_dashboard))
        .route("/charts/:id", get(get_chart).delete(close_chart))
        .route("/charts/:id/mode", put(put_chart_mode))
        .route("/charts/:id/stream", get(stream_chart))
        .route("/reports/:id", get(get_report))
        .route("/reports/:id/export", get(export_report))
        .route("/datasets", get(list_datasets))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    tracing::info!("Starting metric dashboard on {}", config.server.bind);
    let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    live_charts.shutdown().await;
    durable.flush().await?;
    Ok(())
}

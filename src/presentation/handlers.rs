// HTTP request handlers
use crate::domain::metric::{MetricId, RenderMode};
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::csv_export::ExportError;
use crate::infrastructure::http_response::{accepts_brotli, attachment_response, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub mode: Option<RenderMode>,
}

#[derive(Deserialize)]
pub struct ModeRequest {
    pub mode: RenderMode,
}

fn parse_metric(id: &str) -> Result<MetricId, Response> {
    id.parse::<MetricId>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())
}

fn respond(result: Result<Response, StatusCode>) -> Response {
    match result {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Metric tiles and the last update instant
pub async fn get_dashboard(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let dashboard = state.dashboard_service.get_dashboard();
    respond(json_response(&dashboard, accepts_brotli(&headers)).await)
}

/// Current chart configuration, opening the live view if it is not running
pub async fn get_chart(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let metric = match parse_metric(&id) {
        Ok(metric) => metric,
        Err(response) => return response,
    };

    let config = state.live_charts.open(metric).await;
    respond(json_response(&config, accepts_brotli(&headers)).await)
}

/// Switch the render mode of a chart
pub async fn put_chart_mode(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ModeRequest>,
) -> Response {
    let metric = match parse_metric(&id) {
        Ok(metric) => metric,
        Err(response) => return response,
    };

    let config = state.live_charts.switch_mode(metric, request.mode).await;
    respond(json_response(&config, accepts_brotli(&headers)).await)
}

/// Stop the live view of a chart
pub async fn close_chart(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let metric = match parse_metric(&id) {
        Ok(metric) => metric,
        Err(response) => return response,
    };

    if state.live_charts.close(metric).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Stream chart configurations as they are rebuilt on each tick
pub async fn stream_chart(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let metric = match parse_metric(&id) {
        Ok(metric) => metric,
        Err(response) => return response,
    };

    let (config, rx) = state.live_charts.subscribe(metric).await;
    stream_from_receiver(config, rx).into_response()
}

/// Timestamp-aligned report table; mode defaults to bar
pub async fn get_report(
    Path(id): Path<String>,
    Query(query): Query<ReportQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let metric = match parse_metric(&id) {
        Ok(metric) => metric,
        Err(response) => return response,
    };

    let mode = query.mode.unwrap_or(RenderMode::Bar);
    let table = state.report_service.build_table(metric, mode);
    respond(json_response(&table, accepts_brotli(&headers)).await)
}

/// Report table as a CSV download
pub async fn export_report(
    Path(id): Path<String>,
    Query(query): Query<ReportQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let metric = match parse_metric(&id) {
        Ok(metric) => metric,
        Err(response) => return response,
    };

    let mode = query.mode.unwrap_or(RenderMode::Bar);
    match state.report_service.export(metric, mode) {
        Ok(file) => respond(attachment_response(file)),
        Err(e @ ExportError::NoData) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        Err(e) => {
            tracing::error!("Export of {} ({}) failed: {}", metric, mode, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Every stored chart dataset with its point counts
pub async fn list_datasets(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let datasets = state.report_service.inventory();
    respond(json_response(&datasets, accepts_brotli(&headers)).await)
}

// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::live_chart_service::LiveChartService;
use crate::application::report_service::ReportService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub live_charts: Arc<LiveChartService>,
    pub report_service: ReportService,
}

// Dashboard service - Metric tiles for the landing view
use crate::application::live_chart_service::LiveChartService;
use crate::domain::dashboard::{Dashboard, MetricTile};
use crate::domain::metric::MetricId;
use std::sync::Arc;

#[derive(Clone)]
pub struct DashboardService {
    live_charts: Arc<LiveChartService>,
}

impl DashboardService {
    pub fn new(live_charts: Arc<LiveChartService>) -> Self {
        Self { live_charts }
    }

    pub fn get_dashboard(&self) -> Dashboard {
        let tiles = MetricId::ALL.into_iter().map(MetricTile::new).collect();
        Dashboard::new(tiles, self.live_charts.last_updated())
    }
}

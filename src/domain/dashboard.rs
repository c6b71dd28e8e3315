// Dashboard domain model
use super::metric::MetricId;
use chrono::{DateTime, Utc};
use serde::Serialize;

const TILE_PALETTE: [&str; 6] = [
    "#3f51b5", "#4caf50", "#ff9800", "#9c27b0", "#f44336", "#00bcd4",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTile {
    pub id: MetricId,
    pub label: String,
    pub color: String,
}

impl MetricTile {
    pub fn new(id: MetricId) -> Self {
        let n = id.number();
        Self {
            id,
            label: format!("Metric {}", n),
            color: TILE_PALETTE[(n - 1) % TILE_PALETTE.len()].to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub tiles: Vec<MetricTile>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Dashboard {
    pub fn new(tiles: Vec<MetricTile>, last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            tiles,
            last_updated,
        }
    }
}

// Report table domain models
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    /// One slot per sub-series; `None` where that sub-series has no sample.
    pub values: Vec<Option<f64>>,
}

impl ReportRow {
    /// Values as shown in tables and exports: absent slots become 0, two decimals.
    pub fn display_values(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|v| (v.unwrap_or(0.0) * 100.0).round() / 100.0)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// Metric identity domain model
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the six synthetic data channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricId {
    X1,
    X2,
    X3,
    X4,
    X5,
    X6,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown metric id: {0}")]
pub struct ParseMetricError(pub String);

impl MetricId {
    pub const ALL: [MetricId; 6] = [
        MetricId::X1,
        MetricId::X2,
        MetricId::X3,
        MetricId::X4,
        MetricId::X5,
        MetricId::X6,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::X1 => "X1",
            MetricId::X2 => "X2",
            MetricId::X3 => "X3",
            MetricId::X4 => "X4",
            MetricId::X5 => "X5",
            MetricId::X6 => "X6",
        }
    }

    /// 1-based position in `X1..X6`.
    pub fn number(&self) -> usize {
        match self {
            MetricId::X1 => 1,
            MetricId::X2 => 2,
            MetricId::X3 => 3,
            MetricId::X4 => 4,
            MetricId::X5 => 5,
            MetricId::X6 => 6,
        }
    }

    /// Half-open `[low, high)` range of generated values.
    pub fn value_range(&self) -> (f64, f64) {
        match self {
            MetricId::X1 => (0.0, 100.0),
            MetricId::X2 => (8.0, 16.0),
            MetricId::X3 => (10.0, 100.0),
            MetricId::X4 => (40.0, 80.0),
            MetricId::X5 => (100.0, 1000.0),
            MetricId::X6 => (0.0, 100.0),
        }
    }

    pub fn y_ceiling(&self) -> f64 {
        match self {
            MetricId::X1 => 120.0,
            MetricId::X2 => 25.0,
            MetricId::X3 => 120.0,
            MetricId::X4 => 100.0,
            MetricId::X5 => 1000.0,
            MetricId::X6 => 120.0,
        }
    }

    /// Name of the `index`-th (0-based) sub-series, e.g. `X3-1`.
    pub fn sub_series_name(&self, index: usize) -> String {
        format!("{}-{}", self.as_str(), index + 1)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricId {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ParseMetricError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Line,
    Bar,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown render mode: {0}")]
pub struct ParseModeError(pub String);

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Line => "line",
            RenderMode::Bar => "bar",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(RenderMode::Line),
            "bar" => Ok(RenderMode::Bar),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Durable key of the persisted record for a (metric, mode) pair.
pub fn chart_data_key(metric: MetricId, mode: RenderMode) -> String {
    format!("{}{}-{}", CHART_DATA_PREFIX, metric, mode)
}

/// Session key remembering the last chosen render mode for a metric.
pub fn chart_type_key(metric: MetricId) -> String {
    format!("chartType-{}", metric)
}

pub const CHART_DATA_PREFIX: &str = "chartData-";

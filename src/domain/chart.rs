// Render-ready chart configuration domain models
use super::metric::RenderMode;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Output of the chart builder, one variant per render mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartConfig {
    Line(LineChartConfig),
    Bar(BarChartConfig),
}

impl ChartConfig {
    pub fn mode(&self) -> RenderMode {
        match self {
            ChartConfig::Line(_) => RenderMode::Line,
            ChartConfig::Bar(_) => RenderMode::Bar,
        }
    }

    pub fn with_animation(mut self, enabled: bool) -> Self {
        match &mut self {
            ChartConfig::Line(c) => c.animation_enabled = enabled,
            ChartConfig::Bar(c) => c.animation_enabled = enabled,
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChartConfig {
    pub title: String,
    pub animation_enabled: bool,
    pub x_axis: TimeAxis,
    pub y_axis_title: String,
    pub series: Vec<LineSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAxis {
    pub title: String,
    pub value_format: String,
    pub interval_seconds: u32,
    pub viewport_minimum: DateTime<Utc>,
    pub viewport_maximum: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub color: String,
    pub points: Vec<LinePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePoint {
    pub x: DateTime<Utc>,
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarChartConfig {
    pub title: String,
    pub animation_enabled: bool,
    pub x_axis_title: String,
    pub y_axis: ValueAxis,
    pub bars: Vec<BarEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueAxis {
    pub title: String,
    pub include_zero: bool,
    pub maximum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarEntry {
    pub label: String,
    pub value: f64,
    pub color: String,
    pub index_label: String,
    pub index_label_color: String,
    pub index_label_placement: LabelPlacement,
    pub small: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPlacement {
    Inside,
    Outside,
}

// Chart builder - Derives render-ready configurations from a snapshot
use crate::domain::chart::{
    BarChartConfig, BarEntry, ChartConfig, LabelPlacement, LineChartConfig, LinePoint,
    LineSeries, TimeAxis, ValueAxis,
};
use crate::domain::metric::{MetricId, RenderMode};
use crate::domain::series::{MetricSnapshot, SubSeries};
use chrono::{DateTime, Duration, Local, Utc};

/// Visible history on the line chart's time axis.
const VIEWPORT_BEHIND_SECS: i64 = 60;
/// Headroom ahead of `now` so the newest point is not on the edge.
const VIEWPORT_AHEAD_SECS: i64 = 5;
const TIME_LABEL_FORMAT: &str = "%I:%M:%S %p";
const SMALL_VALUE_FRACTION: f64 = 0.1;

const LABEL_DARK: &str = "#000000";
const LABEL_LIGHT: &str = "#ffffff";

/// Builds the configuration for `mode`. Never mutates the snapshot.
pub fn build(snapshot: &MetricSnapshot, mode: RenderMode, now: DateTime<Utc>) -> ChartConfig {
    match mode {
        RenderMode::Line => ChartConfig::Line(build_line(snapshot, now)),
        RenderMode::Bar => ChartConfig::Bar(build_bar(snapshot, now)),
    }
}

pub fn build_line(snapshot: &MetricSnapshot, now: DateTime<Utc>) -> LineChartConfig {
    let series = snapshot
        .sub_series
        .iter()
        .map(|sub| LineSeries {
            name: sub.name.clone(),
            color: sub.color.clone(),
            points: sub
                .data_points
                .iter()
                .map(|s| LinePoint {
                    x: s.timestamp,
                    y: s.value,
                    label: time_label(&s.timestamp),
                })
                .collect(),
        })
        .collect();

    LineChartConfig {
        title: title("Line", snapshot.metric, now),
        animation_enabled: true,
        x_axis: TimeAxis {
            title: "Time (Live)".to_string(),
            value_format: "hh:mm:ss TT".to_string(),
            interval_seconds: 5,
            viewport_minimum: now - Duration::seconds(VIEWPORT_BEHIND_SECS),
            viewport_maximum: now + Duration::seconds(VIEWPORT_AHEAD_SECS),
        },
        y_axis_title: "Value".to_string(),
        series,
    }
}

pub fn build_bar(snapshot: &MetricSnapshot, now: DateTime<Utc>) -> BarChartConfig {
    let ceiling = snapshot.metric.y_ceiling();
    BarChartConfig {
        title: title("Bar", snapshot.metric, now),
        animation_enabled: true,
        x_axis_title: "Sub Variables".to_string(),
        y_axis: ValueAxis {
            title: "Value".to_string(),
            include_zero: true,
            maximum: ceiling,
        },
        bars: snapshot
            .sub_series
            .iter()
            .map(|sub| bar_entry(sub, ceiling))
            .collect(),
    }
}

/// A bar is "small" when its value is under a tenth of the axis ceiling; its
/// label then sits outside the bar in a dark color.
pub fn is_small(value: f64, ceiling: f64) -> bool {
    value < ceiling * SMALL_VALUE_FRACTION
}

fn bar_entry(sub: &SubSeries, ceiling: f64) -> BarEntry {
    let value = sub.latest_value;
    let small = is_small(value, ceiling);
    BarEntry {
        label: sub.name.clone(),
        value,
        color: sub.color.clone(),
        index_label: format!("{:.2}", value),
        index_label_color: if small { LABEL_DARK } else { LABEL_LIGHT }.to_string(),
        index_label_placement: if small {
            LabelPlacement::Outside
        } else {
            LabelPlacement::Inside
        },
        small,
    }
}

fn title(kind: &str, metric: MetricId, now: DateTime<Utc>) -> String {
    let date = now.with_timezone(&Local).format("%b %-d, %Y");
    format!("{} Chart for {} - {}", kind, metric, date)
}

pub fn time_label(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format(TIME_LABEL_FORMAT).to_string()
}

// Rolling time-series domain models
use super::metric::MetricId;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Samples retained per sub-series.
pub const MAX_POINTS: usize = 20;

/// Sub-series per metric.
pub const SUB_SERIES_COUNT: usize = 6;

/// Sub-series colors, assigned by index.
pub const SERIES_PALETTE: [&str; SUB_SERIES_COUNT] = [
    "#3b82f6", "#ef4444", "#84cc16", "#06b6d4", "#8b5cf6", "#0ea5e9",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    /// Timestamps are kept at millisecond precision so they survive ISO-8601 storage.
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(3),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubSeries {
    pub name: String,
    pub color: String,
    pub data_points: Vec<Sample>,
    pub latest_value: f64,
}

impl SubSeries {
    pub fn new(name: String, color: String) -> Self {
        Self {
            name,
            color,
            data_points: Vec::with_capacity(MAX_POINTS + 1),
            latest_value: 0.0,
        }
    }

    /// Append, then evict the oldest sample once over capacity.
    pub fn push(&mut self, sample: Sample) {
        self.data_points.push(sample);
        if self.data_points.len() > MAX_POINTS {
            let excess = self.data_points.len() - MAX_POINTS;
            self.data_points.drain(..excess);
        }
        self.latest_value = sample.value;
    }

    pub fn is_empty(&self) -> bool {
        self.data_points.is_empty()
    }
}

/// The six sub-series of one metric under one render mode.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    pub metric: MetricId,
    pub sub_series: Vec<SubSeries>,
}

impl MetricSnapshot {
    pub fn empty(metric: MetricId) -> Self {
        let sub_series = (0..SUB_SERIES_COUNT)
            .map(|i| SubSeries::new(metric.sub_series_name(i), SERIES_PALETTE[i].to_string()))
            .collect();
        Self { metric, sub_series }
    }

    /// True when there is nothing to show: no sub-series, or the first has no points.
    pub fn is_blank(&self) -> bool {
        self.sub_series.first().map_or(true, SubSeries::is_empty)
    }

    pub fn to_persisted(&self) -> Vec<PersistedSubSeries> {
        self.sub_series
            .iter()
            .map(|sub| PersistedSubSeries {
                name: sub.name.clone(),
                color: Some(sub.color.clone()),
                data_points: sub
                    .data_points
                    .iter()
                    .map(|s| PersistedPoint {
                        x: format_iso(&s.timestamp),
                        y: s.value,
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Stored shape of a sub-series: `{ name, color, dataPoints: [{x, y}] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSubSeries {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub data_points: Vec<PersistedPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPoint {
    pub x: String,
    pub y: f64,
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_iso(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_empty_snapshot_layout() {
        let snapshot = MetricSnapshot::empty(MetricId::X2);
        assert_eq!(snapshot.sub_series.len(), SUB_SERIES_COUNT);
        assert_eq!(snapshot.sub_series[0].name, "X2-1");
        assert_eq!(snapshot.sub_series[5].name, "X2-6");
        assert_eq!(snapshot.sub_series[3].color, "#06b6d4");
        assert!(snapshot.is_blank());
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut sub = SubSeries::new("X1-1".to_string(), SERIES_PALETTE[0].to_string());
        for i in 0..25 {
            sub.push(Sample::new(at(i), i as f64));
        }
        assert_eq!(sub.data_points.len(), MAX_POINTS);
        assert_eq!(sub.data_points[0].value, 5.0);
        assert_eq!(sub.data_points[MAX_POINTS - 1].value, 24.0);
        assert_eq!(sub.latest_value, 24.0);
    }

    #[test]
    fn test_sample_truncates_to_millis() {
        let ts = at(0) + Duration::nanoseconds(123_456_789);
        let sample = Sample::new(ts, 1.0);
        assert_eq!(format_iso(&sample.timestamp), "2023-11-14T22:13:20.123Z");
        assert_eq!(parse_iso("2023-11-14T22:13:20.123Z"), Some(sample.timestamp));
    }

    #[test]
    fn test_persisted_shape() {
        let mut snapshot = MetricSnapshot::empty(MetricId::X1);
        snapshot.sub_series[0].push(Sample::new(at(0), 12.5));
        let json = serde_json::to_value(snapshot.to_persisted()).unwrap();
        assert_eq!(json[0]["name"], "X1-1");
        assert_eq!(json[0]["color"], "#3b82f6");
        assert_eq!(json[0]["dataPoints"][0]["x"], "2023-11-14T22:13:20.000Z");
        assert_eq!(json[0]["dataPoints"][0]["y"], 12.5);
        assert_eq!(json[1]["dataPoints"].as_array().unwrap().len(), 0);
    }
}

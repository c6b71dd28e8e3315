// Report service - Timestamp-aligned tables over persisted chart data
use crate::application::key_value_store::KeyValueStore;
use crate::domain::metric::{chart_data_key, MetricId, RenderMode, CHART_DATA_PREFIX};
use crate::domain::report::{ReportRow, ReportTable};
use crate::domain::series::{parse_iso, PersistedSubSeries, SUB_SERIES_COUNT};
use crate::infrastructure::csv_export::{export_report, ExportError, ExportFile};
use chrono::{DateTime, Local, SubsecRound, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const ROW_LABEL_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Summary of one stored chart dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_counts: Option<Vec<(String, usize)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn KeyValueStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reshapes the persisted record into rows keyed by second-resolution
    /// timestamp, ordered oldest first.
    pub fn build_table(&self, metric: MetricId, mode: RenderMode) -> ReportTable {
        let headers = std::iter::once("Timestamp".to_string())
            .chain((0..SUB_SERIES_COUNT).map(|i| metric.sub_series_name(i)))
            .collect();

        let key = chart_data_key(metric, mode);
        let Some(raw) = self.store.get(&key) else {
            return ReportTable {
                headers,
                rows: Vec::new(),
            };
        };

        let records: Vec<PersistedSubSeries> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("Failed to parse stored data at {}: {}", key, e);
                return ReportTable {
                    headers,
                    rows: Vec::new(),
                };
            }
        };

        let mut aligned: BTreeMap<DateTime<Utc>, Vec<Option<f64>>> = BTreeMap::new();
        for (index, sub) in records.iter().enumerate().take(SUB_SERIES_COUNT) {
            for point in &sub.data_points {
                let Some(ts) = parse_iso(&point.x) else {
                    tracing::warn!("Skipping point with bad timestamp {:?} in {}", point.x, key);
                    continue;
                };
                let slots = aligned
                    .entry(ts.trunc_subsecs(0))
                    .or_insert_with(|| vec![None; SUB_SERIES_COUNT]);
                slots[index] = Some(point.y);
            }
        }

        let rows = aligned
            .into_iter()
            .map(|(timestamp, values)| ReportRow {
                timestamp,
                label: row_label(&timestamp),
                values,
            })
            .collect();

        ReportTable { headers, rows }
    }

    /// Builds the table and renders it as a spreadsheet, refusing empty tables.
    pub fn export(&self, metric: MetricId, mode: RenderMode) -> Result<ExportFile, ExportError> {
        let table = self.build_table(metric, mode);
        export_report(&table, metric, mode)
    }

    /// Describes every stored chart dataset, sorted by key.
    pub fn inventory(&self) -> Vec<DatasetSummary> {
        let mut keys: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(CHART_DATA_PREFIX))
            .collect();
        keys.sort();

        keys.into_iter()
            .map(|key| {
                let parsed = self
                    .store
                    .get(&key)
                    .ok_or("missing")
                    .and_then(|raw| {
                        serde_json::from_str::<Vec<PersistedSubSeries>>(&raw).map_err(|_| "malformed")
                    });
                match parsed {
                    Ok(records) => DatasetSummary {
                        key,
                        point_counts: Some(
                            records
                                .into_iter()
                                .map(|r| (r.name, r.data_points.len()))
                                .collect(),
                        ),
                        problem: None,
                    },
                    Err(problem) => DatasetSummary {
                        key,
                        point_counts: None,
                        problem: Some(problem.to_string()),
                    },
                }
            })
            .collect()
    }

    /// Logs the inventory, one line per dataset.
    pub fn log_inventory(&self) {
        let datasets = self.inventory();
        tracing::info!("Total saved chart datasets: {}", datasets.len());
        for dataset in &datasets {
            match (&dataset.point_counts, &dataset.problem) {
                (Some(counts), _) => {
                    tracing::info!("{}: {} sub-series", dataset.key, counts.len());
                    for (name, points) in counts {
                        tracing::debug!("  {} ({} points)", name, points);
                    }
                }
                (None, problem) => tracing::warn!(
                    "{}: {}",
                    dataset.key,
                    problem.as_deref().unwrap_or("unreadable")
                ),
            }
        }
    }
}

fn row_label(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format(ROW_LABEL_FORMAT).to_string()
}

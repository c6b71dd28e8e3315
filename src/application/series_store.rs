// Series store - Rolling sample windows for one (metric, mode) pair
use crate::application::key_value_store::{KeyValueStore, StoreError};
use crate::domain::metric::{chart_data_key, MetricId, RenderMode};
use crate::domain::series::{
    parse_iso, MetricSnapshot, PersistedSubSeries, Sample, SubSeries, MAX_POINTS,
    SERIES_PALETTE, SUB_SERIES_COUNT,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;

pub struct SeriesStore {
    store: Arc<dyn KeyValueStore>,
    mode: RenderMode,
    snapshot: MetricSnapshot,
}

impl SeriesStore {
    /// Opens the store for `(metric, mode)`, hydrating from any persisted record.
    pub fn open(store: Arc<dyn KeyValueStore>, metric: MetricId, mode: RenderMode) -> Self {
        let snapshot = Self::hydrate(store.as_ref(), metric, mode);
        Self {
            store,
            mode,
            snapshot,
        }
    }

    pub fn initialize(metric: MetricId) -> MetricSnapshot {
        MetricSnapshot::empty(metric)
    }

    /// Rebuilds a snapshot from the persisted record. Anything unreadable degrades
    /// to empty sub-series rather than failing.
    pub fn hydrate(store: &dyn KeyValueStore, metric: MetricId, mode: RenderMode) -> MetricSnapshot {
        let key = chart_data_key(metric, mode);
        let Some(raw) = store.get(&key) else {
            tracing::debug!("No persisted record at {}, starting fresh", key);
            return Self::initialize(metric);
        };

        let records = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(records)) => records,
            Ok(_) => {
                tracing::warn!("Persisted record at {} is not an array, starting fresh", key);
                return Self::initialize(metric);
            }
            Err(e) => {
                tracing::warn!("Failed to parse persisted record at {}: {}", key, e);
                return Self::initialize(metric);
            }
        };

        let mut snapshot = Self::initialize(metric);
        for (index, record) in records.into_iter().enumerate() {
            if index >= SUB_SERIES_COUNT {
                tracing::warn!("Ignoring extra sub-series #{} in {}", index + 1, key);
                break;
            }
            match serde_json::from_value::<PersistedSubSeries>(record) {
                Ok(persisted) => snapshot.sub_series[index] = restore_sub_series(persisted, index),
                Err(e) => {
                    tracing::warn!("Skipping malformed sub-series #{} in {}: {}", index + 1, key, e)
                }
            }
        }

        snapshot
    }

    /// One rounded value in the metric's range.
    pub fn generate_sample<R: Rng + ?Sized>(metric: MetricId, rng: &mut R) -> f64 {
        let (low, high) = metric.value_range();
        let value = (rng.gen_range(low..high) * 100.0).round() / 100.0;
        // Rounding can land on the open upper bound.
        if value >= high {
            (high * 100.0 - 1.0) / 100.0
        } else {
            value
        }
    }

    /// Appends one fresh sample stamped `now` to every sub-series.
    pub fn tick<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) {
        let metric = self.snapshot.metric;
        for sub in &mut self.snapshot.sub_series {
            let value = Self::generate_sample(metric, rng);
            sub.push(Sample::new(now, value));
        }
        tracing::debug!("Ticked {} ({}) at {}", metric, self.mode, now);
    }

    /// Overwrites the persisted record for the current (metric, mode).
    pub fn persist(&self) -> Result<(), StoreError> {
        let key = chart_data_key(self.snapshot.metric, self.mode);
        let encoded = serde_json::to_string(&self.snapshot.to_persisted())?;
        self.store.set(&key, encoded)
    }

    pub fn reset(&mut self) {
        self.snapshot = Self::initialize(self.snapshot.metric);
    }

    pub fn snapshot(&self) -> &MetricSnapshot {
        &self.snapshot
    }

    pub fn metric(&self) -> MetricId {
        self.snapshot.metric
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }
}

fn restore_sub_series(persisted: PersistedSubSeries, index: usize) -> SubSeries {
    let color = persisted
        .color
        .unwrap_or_else(|| SERIES_PALETTE[index].to_string());
    let mut sub = SubSeries::new(persisted.name, color);

    let mut points: Vec<Sample> = persisted
        .data_points
        .into_iter()
        .filter_map(|p| match parse_iso(&p.x) {
            Some(ts) => Some(Sample::new(ts, p.y)),
            None => {
                tracing::warn!("Dropping point with bad timestamp {:?} in {}", p.x, sub.name);
                None
            }
        })
        .collect();

    if points.len() > MAX_POINTS {
        points.drain(..points.len() - MAX_POINTS);
    }
    sub.latest_value = points.last().map_or(0.0, |p| p.value);
    sub.data_points = points;
    sub
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn start() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn fixture(metric: MetricId, mode: RenderMode) -> (Arc<MemoryStore>, SeriesStore) {
        let store = Arc::new(MemoryStore::new());
        let series = SeriesStore::open(store.clone(), metric, mode);
        (store, series)
    }

    #[test]
    fn test_generate_sample_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for metric in MetricId::ALL {
            let (low, high) = metric.value_range();
            for _ in 0..500 {
                let v = SeriesStore::generate_sample(metric, &mut rng);
                assert!(v >= low && v < high, "{} out of range for {}", v, metric);
                assert_eq!((v * 100.0).round() / 100.0, v);
            }
        }
    }

    #[test]
    fn test_tick_caps_and_keeps_order() {
        let (_, mut series) = fixture(MetricId::X1, RenderMode::Line);
        let mut rng = StdRng::seed_from_u64(1);

        for i in 0..30 {
            series.tick(start() + Duration::seconds(5 * i), &mut rng);
            for sub in &series.snapshot().sub_series {
                assert!(sub.data_points.len() <= MAX_POINTS);
                assert!(sub
                    .data_points
                    .windows(2)
                    .all(|w| w[0].timestamp <= w[1].timestamp));
                assert_eq!(sub.latest_value, sub.data_points.last().unwrap().value);
            }
        }
    }

    #[test]
    fn test_fifo_eviction_keeps_most_recent() {
        let (_, mut series) = fixture(MetricId::X3, RenderMode::Line);
        let mut rng = StdRng::seed_from_u64(2);
        let mut generated: Vec<Vec<Sample>> = vec![Vec::new(); SUB_SERIES_COUNT];

        for i in 0..27 {
            series.tick(start() + Duration::seconds(i), &mut rng);
            for (all, sub) in generated.iter_mut().zip(&series.snapshot().sub_series) {
                all.push(*sub.data_points.last().unwrap());
            }
        }

        for (all, sub) in generated.iter().zip(&series.snapshot().sub_series) {
            assert_eq!(sub.data_points, all[all.len() - MAX_POINTS..].to_vec());
        }
    }

    #[test]
    fn test_persist_then_hydrate_round_trips() {
        let (store, mut series) = fixture(MetricId::X2, RenderMode::Line);
        let mut rng = StdRng::seed_from_u64(3);
        let odd = start() + Duration::nanoseconds(987_654_321);
        series.tick(odd, &mut rng);
        series.tick(odd + Duration::seconds(5), &mut rng);
        series.persist().unwrap();

        let restored = SeriesStore::hydrate(store.as_ref(), MetricId::X2, RenderMode::Line);
        assert_eq!(&restored, series.snapshot());
    }

    #[test]
    fn test_modes_are_isolated() {
        let (store, mut series) = fixture(MetricId::X4, RenderMode::Line);
        let mut rng = StdRng::seed_from_u64(4);
        series.tick(start(), &mut rng);
        series.persist().unwrap();

        assert!(store.get("chartData-X4-line").is_some());
        assert!(store.get("chartData-X4-bar").is_none());
        let bar = SeriesStore::hydrate(store.as_ref(), MetricId::X4, RenderMode::Bar);
        assert!(bar.sub_series.iter().all(SubSeries::is_empty));
    }

    #[test]
    fn test_malformed_record_yields_fresh_snapshot() {
        let store = MemoryStore::new();
        store.set("chartData-X1-bar", "not json".to_string()).unwrap();
        let snapshot = SeriesStore::hydrate(&store, MetricId::X1, RenderMode::Bar);
        assert_eq!(snapshot, MetricSnapshot::empty(MetricId::X1));

        store.set("chartData-X1-bar", "{\"a\":1}".to_string()).unwrap();
        let snapshot = SeriesStore::hydrate(&store, MetricId::X1, RenderMode::Bar);
        assert_eq!(snapshot, MetricSnapshot::empty(MetricId::X1));
    }

    #[test]
    fn test_bad_records_do_not_abort_hydration() {
        let store = MemoryStore::new();
        let raw = r##"[
            42,
            {"name": "X1-2", "dataPoints": [
                {"x": "2023-11-14T22:13:20.000Z", "y": 3.5},
                {"x": "yesterday", "y": 9.0},
                {"x": "2023-11-14T22:13:25.000Z", "y": 4.5}
            ]},
            {"name": "X1-3", "color": "#123456", "dataPoints": []}
        ]"##;
        store.set("chartData-X1-line", raw.to_string()).unwrap();

        let snapshot = SeriesStore::hydrate(&store, MetricId::X1, RenderMode::Line);
        assert_eq!(snapshot.sub_series.len(), SUB_SERIES_COUNT);
        assert!(snapshot.sub_series[0].is_empty());

        let second = &snapshot.sub_series[1];
        assert_eq!(second.color, SERIES_PALETTE[1]);
        assert_eq!(second.data_points.len(), 2);
        assert_eq!(second.latest_value, 4.5);

        assert_eq!(snapshot.sub_series[2].color, "#123456");
        assert_eq!(snapshot.sub_series[2].latest_value, 0.0);
        assert_eq!(snapshot.sub_series[5].name, "X1-6");
    }

    #[test]
    fn test_reset_clears_points() {
        let (_, mut series) = fixture(MetricId::X6, RenderMode::Bar);
        let mut rng = StdRng::seed_from_u64(5);
        series.tick(start(), &mut rng);
        assert!(!series.snapshot().is_blank());
        series.reset();
        assert!(series.snapshot().is_blank());
    }
}

// Live chart service - Periodic sampling for the active chart views
use crate::application::chart_builder;
use crate::application::key_value_store::KeyValueStore;
use crate::application::series_store::SeriesStore;
use crate::domain::chart::ChartConfig;
use crate::domain::metric::{chart_type_key, MetricId, RenderMode};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Rebuilt configurations buffered per subscriber before it starts lagging.
const UPDATE_BUFFER: usize = 16;

/// Mutable state of one view, shared with its ticker task.
struct ViewState {
    series: SeriesStore,
    rng: StdRng,
    config: ChartConfig,
}

impl ViewState {
    fn new(series: SeriesStore, now: DateTime<Utc>, animated: bool) -> Self {
        let config = chart_builder::build(series.snapshot(), series.mode(), now)
            .with_animation(animated);
        Self {
            series,
            rng: StdRng::from_entropy(),
            config,
        }
    }

    /// tick -> persist -> rebuild.
    fn advance(&mut self, now: DateTime<Utc>, animated: bool) -> ChartConfig {
        self.series.tick(now, &mut self.rng);
        if let Err(e) = self.series.persist() {
            tracing::warn!(
                "Failed to persist {} ({}): {}",
                self.series.metric(),
                self.series.mode(),
                e
            );
        }
        self.config = chart_builder::build(self.series.snapshot(), self.series.mode(), now)
            .with_animation(animated);
        self.config.clone()
    }
}

/// One live view. Dropping it cancels its ticker; `stop` also waits for it.
struct LiveView {
    mode: RenderMode,
    state: Arc<Mutex<ViewState>>,
    updates: broadcast::Sender<ChartConfig>,
    task: Option<JoinHandle<()>>,
}

impl LiveView {
    /// Cancels the ticker and waits until it has exited, so a tick already in
    /// flight is fully published before anything replaces this view.
    async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!("Ticker for {} panicked: {}", self.mode, e);
                }
            }
        }
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

pub struct LiveChartService {
    store: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    tick_interval: Duration,
    views: Mutex<HashMap<MetricId, LiveView>>,
    last_updated: Arc<watch::Sender<Option<DateTime<Utc>>>>,
}

impl LiveChartService {
    /// `store` holds chart data durably; `session` only remembers render modes.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        tick_interval: Duration,
    ) -> Self {
        let (last_updated, _) = watch::channel(None);
        Self {
            store,
            session,
            tick_interval,
            views: Mutex::new(HashMap::new()),
            last_updated: Arc::new(last_updated),
        }
    }

    pub fn preferred_mode(&self, metric: MetricId) -> RenderMode {
        self.session
            .get(&chart_type_key(metric))
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    fn remember_mode(&self, metric: MetricId, mode: RenderMode) {
        if let Err(e) = self.session.set(&chart_type_key(metric), mode.to_string()) {
            tracing::warn!("Failed to remember mode for {}: {}", metric, e);
        }
    }

    /// Returns the current configuration for `metric`, starting its view if needed.
    pub async fn open(&self, metric: MetricId) -> ChartConfig {
        let mut views = self.views.lock().await;
        if let Some(view) = views.get(&metric) {
            return view.state.lock().await.config.clone();
        }

        let mode = self.preferred_mode(metric);
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        let (view, config) = self.start_view(metric, mode, updates, false).await;
        views.insert(metric, view);
        config
    }

    /// Cancels the running view and restarts it against the other mode's data.
    pub async fn switch_mode(&self, metric: MetricId, mode: RenderMode) -> ChartConfig {
        let mut views = self.views.lock().await;
        let updates = match views.remove(&metric) {
            Some(previous) => {
                tracing::info!("Switching {} from {} to {}", metric, previous.mode, mode);
                let updates = previous.updates.clone();
                previous.stop().await;
                updates
            }
            None => broadcast::channel(UPDATE_BUFFER).0,
        };

        self.remember_mode(metric, mode);
        let (view, config) = self.start_view(metric, mode, updates, true).await;
        views.insert(metric, view);
        config
    }

    /// Stops the view's ticker. Persisted data is left as is.
    pub async fn close(&self, metric: MetricId) -> bool {
        let removed = self.views.lock().await.remove(&metric);
        match removed {
            Some(view) => {
                view.stop().await;
                tracing::info!("Closed live view for {}", metric);
                true
            }
            None => false,
        }
    }

    /// Current configuration plus a receiver for every rebuild after a tick.
    pub async fn subscribe(
        &self,
        metric: MetricId,
    ) -> (ChartConfig, broadcast::Receiver<ChartConfig>) {
        let config = self.open(metric).await;
        let views = self.views.lock().await;
        let rx = match views.get(&metric) {
            Some(view) => view.updates.subscribe(),
            None => broadcast::channel(1).1,
        };
        (config, rx)
    }

    pub async fn active_mode(&self, metric: MetricId) -> Option<RenderMode> {
        self.views.lock().await.get(&metric).map(|v| v.mode)
    }

    /// Instant of the most recent tick across all views.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        *self.last_updated.borrow()
    }

    pub async fn shutdown(&self) {
        let mut views = self.views.lock().await;
        tracing::info!("Stopping {} live views", views.len());
        for (_, view) in views.drain() {
            view.stop().await;
        }
    }

    async fn start_view(
        &self,
        metric: MetricId,
        mode: RenderMode,
        updates: broadcast::Sender<ChartConfig>,
        switched: bool,
    ) -> (LiveView, ChartConfig) {
        let mut series = SeriesStore::open(self.store.clone(), metric, mode);
        if switched && series.snapshot().is_blank() {
            series.reset();
        }

        let now = Utc::now();
        let mut state = ViewState::new(series, now, !switched);
        let config = state.advance(now, !switched);
        self.last_updated.send_replace(Some(now));
        let _ = updates.send(config.clone());

        let state = Arc::new(Mutex::new(state));
        let task = spawn_ticker(
            state.clone(),
            updates.clone(),
            self.last_updated.clone(),
            self.tick_interval,
        );
        tracing::info!("Started live view for {} ({})", metric, mode);

        let view = LiveView {
            mode,
            state,
            updates,
            task: Some(task),
        };
        (view, config)
    }
}

fn spawn_ticker(
    state: Arc<Mutex<ViewState>>,
    updates: broadcast::Sender<ChartConfig>,
    last_updated: Arc<watch::Sender<Option<DateTime<Utc>>>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let now = Utc::now();
            let config = state.lock().await.advance(now, true);
            last_updated.send_replace(Some(now));
            // No subscribers is normal.
            let _ = updates.send(config);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::key_value_store::StoreError;
    use crate::domain::series::{MetricSnapshot, MAX_POINTS};
    use crate::infrastructure::memory_store::MemoryStore;

    const PERIOD: Duration = Duration::from_secs(5);

    fn service() -> (Arc<MemoryStore>, Arc<MemoryStore>, LiveChartService) {
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(MemoryStore::new());
        let service = LiveChartService::new(store.clone(), session.clone(), PERIOD);
        (store, session, service)
    }

    fn point_counts(config: &ChartConfig) -> Vec<usize> {
        match config {
            ChartConfig::Line(c) => c.series.iter().map(|s| s.points.len()).collect(),
            ChartConfig::Bar(_) => panic!("expected a line chart"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_ticks_immediately_and_persists() {
        let (store, _, service) = service();
        let config = service.open(MetricId::X1).await;

        assert_eq!(config.mode(), RenderMode::Line);
        assert_eq!(point_counts(&config), vec![1; 6]);
        assert!(store.get("chartData-X1-line").is_some());
        assert!(service.last_updated().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_pushes_updates_every_period() {
        let (store, _, service) = service();
        let (_, mut rx) = service.subscribe(MetricId::X2).await;

        // The initial config was sent before we subscribed.
        for expected in 2..=4 {
            let config = rx.recv().await.unwrap();
            assert_eq!(point_counts(&config), vec![expected; 6]);
        }

        let snapshot = SeriesStore::hydrate(store.as_ref(), MetricId::X2, RenderMode::Line);
        assert_eq!(snapshot.sub_series[0].data_points.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_stays_capped_under_the_ticker() {
        let (_, _, service) = service();
        let (_, mut rx) = service.subscribe(MetricId::X3).await;

        let mut last = None;
        for _ in 0..(MAX_POINTS + 5) {
            last = Some(rx.recv().await.unwrap());
        }
        assert_eq!(point_counts(&last.unwrap()), vec![MAX_POINTS; 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_returns_running_view() {
        let (_, _, service) = service();
        let first = service.open(MetricId::X4).await;
        let again = service.open(MetricId::X4).await;
        assert_eq!(first, again);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_mode_uses_separate_record() {
        let (store, session, service) = service();
        service.open(MetricId::X5).await;
        let line_before = store.get("chartData-X5-line").unwrap();

        let config = service.switch_mode(MetricId::X5, RenderMode::Bar).await;
        match &config {
            ChartConfig::Bar(bar) => {
                assert!(!bar.animation_enabled);
                assert_eq!(bar.bars.len(), 6);
                assert!(bar.bars.iter().all(|b| b.value >= 100.0));
            }
            ChartConfig::Line(_) => panic!("expected a bar chart"),
        }

        assert_eq!(session.get("chartType-X5"), Some("bar".to_string()));
        assert_eq!(store.get("chartData-X5-line").unwrap(), line_before);
        let bar = SeriesStore::hydrate(store.as_ref(), MetricId::X5, RenderMode::Bar);
        assert_eq!(bar.sub_series[0].data_points.len(), 1);
        assert_eq!(service.active_mode(MetricId::X5).await, Some(RenderMode::Bar));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_survive_mode_switch() {
        let (_, _, service) = service();
        let (_, mut rx) = service.subscribe(MetricId::X6).await;
        service.switch_mode(MetricId::X6, RenderMode::Bar).await;

        let config = rx.recv().await.unwrap();
        assert_eq!(config.mode(), RenderMode::Bar);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_ticking_and_keeps_data() {
        let (store, _, service) = service();
        service.open(MetricId::X1).await;
        assert!(service.close(MetricId::X1).await);
        assert!(!service.close(MetricId::X1).await);

        tokio::time::sleep(PERIOD * 3).await;
        let snapshot = SeriesStore::hydrate(store.as_ref(), MetricId::X1, RenderMode::Line);
        assert_eq!(snapshot.sub_series[0].data_points.len(), 1);
        assert_eq!(service.active_mode(MetricId::X1).await, None);
    }

    /// Memory store whose line-mode writes take a while, so a tick can be
    /// caught half way through persisting.
    struct SlowLineStore {
        inner: MemoryStore,
        delay: Duration,
    }

    impl KeyValueStore for SlowLineStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
            if key.ends_with("-line") {
                std::thread::sleep(self.delay);
            }
            self.inner.set(key, value)
        }

        fn keys(&self) -> Vec<String> {
            self.inner.keys()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_switch_waits_for_in_flight_tick() {
        let store = Arc::new(SlowLineStore {
            inner: MemoryStore::new(),
            delay: Duration::from_millis(300),
        });
        let service = LiveChartService::new(
            store,
            Arc::new(MemoryStore::new()),
            Duration::from_millis(200),
        );
        let (_, mut rx) = service.subscribe(MetricId::X1).await;

        // The first tick fires at 200ms and is still persisting at 250ms.
        tokio::time::sleep(Duration::from_millis(250)).await;
        service.switch_mode(MetricId::X1, RenderMode::Bar).await;

        let deadline = tokio::time::Instant::now() + Duration::from_millis(700);
        let mut modes = Vec::new();
        while let Ok(Ok(config)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            modes.push(config.mode());
        }

        let first_bar = modes
            .iter()
            .position(|m| *m == RenderMode::Bar)
            .expect("no bar config after the switch");
        assert!(
            modes[first_bar..].iter().all(|m| *m == RenderMode::Bar),
            "line config after switch: {:?}",
            modes
        );
        service.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_preferred_mode_defaults_to_line() {
        let (_, session, service) = service();
        assert_eq!(service.preferred_mode(MetricId::X2), RenderMode::Line);

        session.set("chartType-X2", "bar".to_string()).unwrap();
        assert_eq!(service.preferred_mode(MetricId::X2), RenderMode::Bar);

        session.set("chartType-X2", "pie".to_string()).unwrap();
        assert_eq!(service.preferred_mode(MetricId::X2), RenderMode::Line);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_resumes_persisted_history() {
        let (store, _, service) = service();
        service.open(MetricId::X3).await;
        service.shutdown().await;

        let resumed = LiveChartService::new(store.clone(), Arc::new(MemoryStore::new()), PERIOD);
        let config = resumed.open(MetricId::X3).await;
        assert_eq!(point_counts(&config), vec![2; 6]);
        assert_ne!(
            SeriesStore::hydrate(store.as_ref(), MetricId::X3, RenderMode::Line),
            MetricSnapshot::empty(MetricId::X3)
        );
    }
}

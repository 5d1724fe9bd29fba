//! In-memory tag reader

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    tag::{TagEvent, TagEventSink, TagHardwareService},
    time::{Clock, SystemClock},
};
use core_schema::{SensorReading, TagConfiguration, TagInfo};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timestamp of the first seeded reading (2021-05-03T00:00:00Z).
const SEED_TIMESTAMP: f64 = 1_620_000_000.0;

/// Behaviour of a [`SimulatedTagService`].
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Delay between session open and the automatic connect
    pub connect_delay: Duration,
    /// Delay between session open and the automatic disconnect
    pub disconnect_delay: Duration,
    /// Tag reported on connect
    pub tag_info: TagInfo,
    /// Emit connect/disconnect automatically after a session opens
    pub auto_events: bool,
    /// Remove readings once pulled
    pub drain_readings: bool,
    /// Whether written configurations are acknowledged by the tag
    pub accept_configs: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_millis(1000),
            disconnect_delay: Duration::from_millis(3000),
            tag_info: TagInfo::new("12345").with_temperature(),
            auto_events: true,
            drain_readings: false,
            accept_configs: true,
        }
    }
}

impl SimulatorConfig {
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn with_disconnect_delay(mut self, delay: Duration) -> Self {
        self.disconnect_delay = delay;
        self
    }

    pub fn with_tag_info(mut self, tag_info: TagInfo) -> Self {
        self.tag_info = tag_info;
        self
    }

    pub fn with_auto_events(mut self, enabled: bool) -> Self {
        self.auto_events = enabled;
        self
    }

    pub fn with_drain_readings(mut self, enabled: bool) -> Self {
        self.drain_readings = enabled;
        self
    }

    pub fn with_accept_configs(mut self, accept: bool) -> Self {
        self.accept_configs = accept;
        self
    }
}

/// Collaborator call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatorStats {
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    pub configs_written: usize,
    pub configs_read: usize,
    pub pulls: usize,
}

struct Session {
    sink: Arc<dyn TagEventSink>,
    cancel: CancellationToken,
    auto_task: Option<JoinHandle<()>>,
}

struct SimState {
    available: bool,
    session: Option<Session>,
    connected: Option<TagInfo>,
    stored_config: TagConfiguration,
    readings: Vec<SensorReading>,
    stats: SimulatorStats,
}

impl SimState {
    fn sink(&self) -> Result<Arc<dyn TagEventSink>> {
        self.session
            .as_ref()
            .map(|session| Arc::clone(&session.sink))
            .ok_or_else(session_closed_error)
    }
}

fn session_closed_error() -> BridgeError {
    BridgeError::OperationFailed("Reader session is not open".to_string())
}

/// Tag reader simulated in memory.
pub struct SimulatedTagService {
    config: SimulatorConfig,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedTagService {
    pub fn new(config: SimulatorConfig) -> Self {
        let state = SimState {
            available: true,
            session: None,
            connected: None,
            stored_config: TagConfiguration::default(),
            readings: vec![
                SensorReading::temperature(SEED_TIMESTAMP, 25.5),
                SensorReading::temperature(SEED_TIMESTAMP + 1000.0, 25.6),
            ],
            stats: SimulatorStats::default(),
        };

        Self {
            config,
            clock: Arc::new(SystemClock),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Use `clock` to timestamp recorded readings.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Makes the next `open_session` fail as if the vendor library were
    /// missing.
    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    pub fn is_session_open(&self) -> bool {
        self.state.lock().session.is_some()
    }

    pub fn connected_tag(&self) -> Option<TagInfo> {
        self.state.lock().connected.clone()
    }

    pub fn stored_config(&self) -> TagConfiguration {
        self.state.lock().stored_config.clone()
    }

    pub fn stats(&self) -> SimulatorStats {
        self.state.lock().stats
    }

    /// Reports the configured tag as connected.
    pub fn simulate_connect(&self) -> Result<()> {
        self.simulate_connect_with(self.config.tag_info.clone())
    }

    /// Reports `tag_info` as connected.
    pub fn simulate_connect_with(&self, tag_info: TagInfo) -> Result<()> {
        emit_connected(&self.state, tag_info)
    }

    /// Reports the tag as gone.
    pub fn simulate_disconnect(&self) -> Result<()> {
        emit_disconnected(&self.state)
    }

    pub fn record_temperature(&self, temperature: f64) {
        let reading = SensorReading::temperature(self.now(), temperature);
        self.push_reading(reading);
    }

    pub fn record_humidity(&self, humidity: f64) {
        let reading = SensorReading::humidity(self.now(), humidity);
        self.push_reading(reading);
    }

    pub fn record_acceleration(&self, x: f64, y: f64, z: f64) {
        let reading = SensorReading::accelerometer(self.now(), x, y, z);
        self.push_reading(reading);
    }

    pub fn record_event(&self, event_type: impl Into<String>, data: serde_json::Value) {
        let reading = SensorReading::event(self.now(), event_type, data);
        self.push_reading(reading);
    }

    /// Appends an already timestamped reading.
    pub fn push_reading(&self, reading: SensorReading) {
        self.state.lock().readings.push(reading);
    }

    pub fn clear_readings(&self) {
        self.state.lock().readings.clear();
    }

    pub fn buffered_readings(&self) -> usize {
        self.state.lock().readings.len()
    }

    fn now(&self) -> f64 {
        self.clock.unix_timestamp_secs_f64()
    }

    fn spawn_auto_events(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let tag_info = self.config.tag_info.clone();
        let start = Instant::now();
        let connect_at = start + self.config.connect_delay;
        let disconnect_at = start + self.config.disconnect_delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep_until(connect_at) => {
                    if let Err(e) = emit_connected(&state, tag_info) {
                        debug!(error = %e, "Automatic connect skipped");
                        return;
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = sleep_until(disconnect_at) => {
                    if let Err(e) = emit_disconnected(&state) {
                        debug!(error = %e, "Automatic disconnect skipped");
                    }
                }
            }
        })
    }
}

impl Default for SimulatedTagService {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

fn emit_connected(state: &Mutex<SimState>, tag_info: TagInfo) -> Result<()> {
    let sink = {
        let mut state = state.lock();
        let sink = state.sink()?;
        state.connected = Some(tag_info.clone());
        sink
    };
    debug!(tag_id = %tag_info.tag_id, "Simulated tag connected");
    sink.emit(TagEvent::Connected(tag_info));
    Ok(())
}

fn emit_disconnected(state: &Mutex<SimState>) -> Result<()> {
    let sink = {
        let mut state = state.lock();
        let sink = state.sink()?;
        state.connected = None;
        sink
    };
    debug!("Simulated tag disconnected");
    sink.emit(TagEvent::Disconnected);
    Ok(())
}

#[async_trait]
impl TagHardwareService for SimulatedTagService {
    async fn open_session(&self, events: Arc<dyn TagEventSink>) -> Result<()> {
        let cancel = CancellationToken::new();
        {
            let mut state = self.state.lock();
            if !state.available {
                return Err(BridgeError::NotAvailable(
                    "Simulated tag library is unavailable".to_string(),
                ));
            }
            if state.session.is_some() {
                return Err(BridgeError::OperationFailed(
                    "Reader session already open".to_string(),
                ));
            }
            state.session = Some(Session {
                sink: events,
                cancel: cancel.clone(),
                auto_task: None,
            });
            state.stats.sessions_opened += 1;
        }

        if self.config.auto_events {
            let task = self.spawn_auto_events(cancel);
            if let Some(session) = self.state.lock().session.as_mut() {
                session.auto_task = Some(task);
            }
        }

        info!(auto_events = self.config.auto_events, "Simulated reader session opened");
        Ok(())
    }

    async fn close_session(&self) -> Result<()> {
        let session = {
            let mut state = self.state.lock();
            state.connected = None;
            state.session.take()
        };

        let Some(session) = session else {
            debug!("No simulated session to close");
            return Ok(());
        };

        session.cancel.cancel();
        if let Some(task) = session.auto_task {
            if let Err(e) = task.await {
                warn!(error = %e, "Automatic event task ended abnormally");
            }
        }

        self.state.lock().stats.sessions_closed += 1;
        info!("Simulated reader session closed");
        Ok(())
    }

    async fn push_config(&self, config: &TagConfiguration) -> Result<bool> {
        let mut state = self.state.lock();
        state.sink()?;
        state.stats.configs_written += 1;

        if !self.config.accept_configs {
            debug!("Simulated tag rejected configuration");
            return Ok(false);
        }

        state.stored_config = config.clone();
        debug!(
            interval = config.measurement_config.interval,
            running_time = config.measurement_config.running_time,
            "Simulated tag configured"
        );
        Ok(true)
    }

    async fn read_config(&self) -> Result<TagConfiguration> {
        let mut state = self.state.lock();
        state.sink()?;
        state.stats.configs_read += 1;
        Ok(state.stored_config.clone())
    }

    async fn pull_readings(&self, limit: usize) -> Result<Vec<SensorReading>> {
        let mut state = self.state.lock();
        state.sink()?;
        state.stats.pulls += 1;

        let count = limit.min(state.readings.len());
        let readings = if self.config.drain_readings {
            state.readings.drain(..count).collect()
        } else {
            state.readings[..count].to_vec()
        };
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::tag::EventKind;
    use chrono::{DateTime, TimeZone, Utc};
    use core_schema::{MeasurementConfig, TemperatureConfig};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<TagEvent>>,
    }

    impl RecordingSink {
        fn kinds(&self) -> Vec<EventKind> {
            self.events.lock().iter().map(TagEvent::kind).collect()
        }
    }

    impl TagEventSink for RecordingSink {
        fn emit(&self, event: TagEvent) {
            self.events.lock().push(event);
        }
    }

    fn manual() -> SimulatedTagService {
        SimulatedTagService::new(SimulatorConfig::default().with_auto_events(false))
    }

    #[tokio::test]
    async fn test_default_config_and_readings() {
        let service = manual();
        service.open_session(Arc::new(RecordingSink::default())).await.unwrap();

        let config = service.read_config().await.unwrap();
        assert_eq!(config.measurement_config, MeasurementConfig::new(60, 0, 3600));
        assert_eq!(config.temperature_config, TemperatureConfig::new(-10.0, 50.0));

        let readings = service.pull_readings(10).await.unwrap();
        assert_eq!(
            readings,
            vec![
                SensorReading::temperature(1_620_000_000.0, 25.5),
                SensorReading::temperature(1_620_001_000.0, 25.6),
            ]
        );
    }

    #[tokio::test]
    async fn test_operations_require_session() {
        let service = manual();
        assert!(service.read_config().await.is_err());
        assert!(service.pull_readings(1).await.is_err());
        assert!(service.push_config(&TagConfiguration::default()).await.is_err());
        assert!(service.simulate_connect().is_err());
    }

    #[tokio::test]
    async fn test_unavailable_library_fails_open() {
        let service = manual();
        service.set_available(false);

        let err = service
            .open_session(Arc::new(RecordingSink::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::NotAvailable(_)));
        assert!(!service.is_session_open());
    }

    #[tokio::test]
    async fn test_second_open_rejected() {
        let service = manual();
        service.open_session(Arc::new(RecordingSink::default())).await.unwrap();
        assert!(service
            .open_session(Arc::new(RecordingSink::default()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_push_config_is_stored() {
        let service = manual();
        service.open_session(Arc::new(RecordingSink::default())).await.unwrap();

        let config = TagConfiguration::new(
            MeasurementConfig::new(30, 5, 600),
            TemperatureConfig::new(2.0, 8.0),
        );
        assert!(service.push_config(&config).await.unwrap());
        assert_eq!(service.read_config().await.unwrap(), config);
        assert_eq!(service.stats().configs_written, 1);
    }

    #[tokio::test]
    async fn test_rejecting_tag_keeps_previous_config() {
        let service = SimulatedTagService::new(
            SimulatorConfig::default()
                .with_auto_events(false)
                .with_accept_configs(false),
        );
        service.open_session(Arc::new(RecordingSink::default())).await.unwrap();

        let config = TagConfiguration::new(
            MeasurementConfig::new(30, 5, 600),
            TemperatureConfig::new(2.0, 8.0),
        );
        assert!(!service.push_config(&config).await.unwrap());
        assert_eq!(service.stored_config(), TagConfiguration::default());
    }

    #[tokio::test]
    async fn test_pull_respects_limit_and_drain() {
        let service = SimulatedTagService::new(
            SimulatorConfig::default()
                .with_auto_events(false)
                .with_drain_readings(true),
        );
        service.open_session(Arc::new(RecordingSink::default())).await.unwrap();

        assert_eq!(service.pull_readings(1).await.unwrap().len(), 1);
        assert_eq!(service.buffered_readings(), 1);
        assert_eq!(service.pull_readings(5).await.unwrap().len(), 1);
        assert!(service.pull_readings(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recorded_readings_use_clock() {
        let instant = Utc.timestamp_millis_opt(1_700_000_000_500).unwrap();
        let service = manual().with_clock(Arc::new(FixedClock(instant)));
        service.clear_readings();
        service.record_humidity(41.0);
        service.record_acceleration(0.0, 0.1, 9.8);
        service.record_event("shock", serde_json::json!({"amplitude": 3.2}));

        service.open_session(Arc::new(RecordingSink::default())).await.unwrap();
        let readings = service.pull_readings(10).await.unwrap();
        assert_eq!(readings.len(), 3);
        assert!(readings.iter().all(|r| r.timestamp() == 1_700_000_000.5));
    }

    #[tokio::test]
    async fn test_manual_presence_events() {
        let service = manual();
        let sink = Arc::new(RecordingSink::default());
        service.open_session(sink.clone()).await.unwrap();

        service.simulate_connect().unwrap();
        assert_eq!(service.connected_tag().unwrap().tag_id, "12345");
        service.simulate_disconnect().unwrap();
        assert!(service.connected_tag().is_none());

        assert_eq!(
            sink.kinds(),
            vec![EventKind::TagConnected, EventKind::TagDisconnected]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_events_follow_delays() {
        let service = SimulatedTagService::default();
        let sink = Arc::new(RecordingSink::default());
        service.open_session(sink.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(sink.kinds().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(sink.kinds(), vec![EventKind::TagConnected]);
        match &sink.events.lock()[0] {
            TagEvent::Connected(info) => {
                assert!(info.can_measure_temperature);
                assert!(!info.can_measure_humidity);
                assert!(!info.can_measure_acceleration);
            }
            other => panic!("unexpected event {:?}", other),
        }

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(
            sink.kinds(),
            vec![EventKind::TagConnected, EventKind::TagDisconnected]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_auto_events() {
        let service = SimulatedTagService::default();
        let sink = Arc::new(RecordingSink::default());
        service.open_session(sink.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        service.close_session().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(sink.kinds().is_empty());
        assert_eq!(service.stats().sessions_closed, 1);
    }

    #[tokio::test]
    async fn test_close_without_session_is_noop() {
        let service = manual();
        service.close_session().await.unwrap();
        assert_eq!(service.stats().sessions_closed, 0);
    }
}

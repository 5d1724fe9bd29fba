//! # Tag Reader Facade
//!
//! The single entry point the host bridge calls into.
//!
//! ## Overview
//!
//! [`TagReaderService`] owns the subscription registry, the event dispatcher
//! and the host event bus, and drives the hardware collaborator through the
//! reader lifecycle:
//!
//! - `initTagReader` / `deinitTagReader` are serialized by a transition lock
//!   and run on a spawned task. A caller that stops waiting (a timeout, a
//!   dropped future) does not cancel the transition; the reader still ends in
//!   `Ready`, `Uninitialized` or `Failed`, and the next transition waits for it.
//! - `setConfig`, `getConfig` and `getData` only read the current state; they
//!   never wait on a transition and never reach the collaborator unless the
//!   reader is `Ready`.
//! - Presence listeners live independently of the lifecycle: a listener added
//!   before `initTagReader` receives the events of every later session.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::BridgeConfig;
//! use core_schema::{MeasurementConfig, TemperatureConfig};
//! use core_service::TagReaderService;
//!
//! let service = TagReaderService::new(BridgeConfig::builder().build()?);
//! let mut events = service.events();
//!
//! let listener = service.add_tag_connected_listener();
//! service.init_tag_reader().await?;
//! service
//!     .set_config(
//!         MeasurementConfig::new(60, 0, 3600),
//!         TemperatureConfig::new(-10.0, 50.0),
//!         None,
//!         None,
//!     )
//!     .await?;
//! let data = service.get_data().await?;
//! service.remove_tag_connected_listener(listener);
//! service.deinit_tag_reader().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use bridge_traits::tag::{EventKind, TagEvent};
use core_runtime::config::BridgeConfig;
use core_runtime::dispatcher::EventDispatcher;
use core_runtime::events::{BridgeEvent, EventBus, EventStream, Receiver};
use core_runtime::logging::strip_path;
use core_runtime::subscriptions::{
    ListenerResult, Subscription, SubscriptionId, SubscriptionRegistry, TagListener,
};
use core_schema::{
    AccelerometerConfig, HumidityConfig, MeasurementConfig, SensorData, TagConfiguration,
    TemperatureConfig,
};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::error::{CoreError, InitError, Operation, Result};
use crate::lifecycle::{Lifecycle, ReaderState};

/// Bridge facade over the tag hardware collaborator.
pub struct TagReaderService {
    core: Arc<ReaderCore>,
}

/// State shared with the transition tasks.
struct ReaderCore {
    config: BridgeConfig,
    registry: Arc<SubscriptionRegistry>,
    dispatcher: EventDispatcher,
    event_bus: EventBus,
    lifecycle: Lifecycle,
    transition_lock: Mutex<()>,
}

impl TagReaderService {
    pub fn new(config: BridgeConfig) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = EventDispatcher::new(Arc::clone(&registry));
        let event_bus = EventBus::new(config.host_event_buffer);
        let lifecycle = Lifecycle::new(event_bus.clone());

        Self {
            core: Arc::new(ReaderCore {
                config,
                registry,
                dispatcher,
                event_bus,
                lifecycle,
                transition_lock: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.core.config
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Opens a reader session.
    ///
    /// Resolves `true` once the reader is `Ready`, including when it already
    /// was. On failure the reader is left `Failed`.
    #[instrument(skip(self))]
    pub async fn init_tag_reader(&self) -> Result<bool> {
        self.run_transition(Operation::InitTagReader, |core| async move {
            core.init().await
        })
        .await
    }

    /// Closes the reader session.
    ///
    /// Idempotent: resolves `true` without touching the collaborator when the
    /// reader is not initialized. From `Failed` the teardown is best effort.
    #[instrument(skip(self))]
    pub async fn deinit_tag_reader(&self) -> Result<bool> {
        self.run_transition(Operation::DeinitTagReader, |core| async move {
            core.deinit().await
        })
        .await
    }

    /// Runs a lifecycle transition to completion on its own task.
    async fn run_transition<F, Fut>(&self, operation: Operation, transition: F) -> Result<bool>
    where
        F: FnOnce(Arc<ReaderCore>) -> Fut,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        let task = tokio::spawn(transition(Arc::clone(&self.core)).in_current_span());

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(operation = %operation, error = %e, "Reader transition task ended abnormally");
                self.core.recover_aborted_transition().await;
                Err(CoreError::Runtime(core_runtime::Error::Internal(format!(
                    "{} did not complete: {}",
                    operation, e
                ))))
            }
        }
    }

    pub fn state(&self) -> ReaderState {
        self.core.lifecycle.current()
    }

    pub fn watch_state(&self) -> watch::Receiver<ReaderState> {
        self.core.lifecycle.watch()
    }

    // ========================================================================
    // Configuration & Data
    // ========================================================================

    /// Validates and writes a configuration to the connected tag.
    ///
    /// Resolves with whether the tag accepted it.
    #[instrument(skip_all, fields(interval = measurement.interval, running_time = measurement.running_time))]
    pub async fn set_config(
        &self,
        measurement: MeasurementConfig,
        temperature: TemperatureConfig,
        humidity: Option<HumidityConfig>,
        accelerometer: Option<AccelerometerConfig>,
    ) -> Result<bool> {
        let config = TagConfiguration {
            measurement_config: measurement,
            temperature_config: temperature,
            humidity_config: humidity,
            accelerometer_config: accelerometer,
        };
        self.apply_config(&config).await
    }

    /// [`set_config`](Self::set_config) for an assembled configuration.
    pub async fn apply_config(&self, config: &TagConfiguration) -> Result<bool> {
        self.core.ensure_ready(Operation::SetConfig)?;
        config.validate()?;

        let accepted = self
            .core
            .config
            .tag_service
            .push_config(config)
            .await
            .map_err(CoreError::collaborator(Operation::SetConfig))?;

        if accepted {
            info!(
                expected_samples = config.measurement_config.expected_samples(),
                "Tag configuration written"
            );
        } else {
            warn!("Tag rejected configuration");
        }
        Ok(accepted)
    }

    /// Reads the configuration stored on the tag.
    #[instrument(skip(self))]
    pub async fn get_config(&self) -> Result<TagConfiguration> {
        self.core.ensure_ready(Operation::GetConfig)?;

        self.core
            .config
            .tag_service
            .read_config()
            .await
            .map_err(CoreError::collaborator(Operation::GetConfig))
    }

    /// Pulls buffered readings, grouped by kind and ordered by timestamp.
    #[instrument(skip(self))]
    pub async fn get_data(&self) -> Result<SensorData> {
        self.core.ensure_ready(Operation::GetData)?;

        let limit = self.core.config.max_readings_per_batch;
        let mut readings = self
            .core
            .config
            .tag_service
            .pull_readings(limit)
            .await
            .map_err(CoreError::collaborator(Operation::GetData))?;

        if readings.len() > limit {
            warn!(
                received = readings.len(),
                limit, "Collaborator returned more readings than requested, truncating"
            );
            readings.truncate(limit);
        }

        let data = SensorData::from_readings(readings);
        debug!(readings = data.len(), kinds = ?data.kinds(), "Sensor data pulled");
        Ok(data)
    }

    // ========================================================================
    // Presence Listeners
    // ========================================================================

    /// Registers a host listener for tag connections.
    ///
    /// Each delivery is published on the event bus as
    /// [`BridgeEvent::TagConnected`] carrying the returned id.
    pub fn add_tag_connected_listener(&self) -> SubscriptionId {
        let bus = self.core.event_bus.clone();
        self.core
            .registry
            .subscribe_with(EventKind::TagConnected, move |subscription_id| {
                let forward: TagListener = Arc::new(move |event: &TagEvent| {
                    if let TagEvent::Connected(tag_info) = event {
                        publish(
                            &bus,
                            BridgeEvent::TagConnected {
                                subscription_id,
                                tag_info: tag_info.clone(),
                            },
                        );
                    }
                    Ok(())
                });
                forward
            })
    }

    /// Registers a host listener for tag disconnections.
    pub fn add_tag_disconnected_listener(&self) -> SubscriptionId {
        let bus = self.core.event_bus.clone();
        self.core
            .registry
            .subscribe_with(EventKind::TagDisconnected, move |subscription_id| {
                let forward: TagListener = Arc::new(move |_event: &TagEvent| {
                    publish(&bus, BridgeEvent::TagDisconnected { subscription_id });
                    Ok(())
                });
                forward
            })
    }

    /// Removes a connected-listener. Unknown ids are ignored.
    pub fn remove_tag_connected_listener(&self, id: SubscriptionId) {
        self.core
            .registry
            .unsubscribe_kind(id, EventKind::TagConnected);
    }

    /// Removes a disconnected-listener. Unknown ids are ignored.
    pub fn remove_tag_disconnected_listener(&self, id: SubscriptionId) {
        self.core
            .registry
            .unsubscribe_kind(id, EventKind::TagDisconnected);
    }

    /// Registers an in-process callback for `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&TagEvent) -> ListenerResult + Send + Sync + 'static,
    {
        let listener: TagListener = Arc::new(callback);
        self.core.registry.subscribe(kind, listener)
    }

    /// Removes any subscription. Returns whether one was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.core.registry.unsubscribe(id)
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.core.registry.subscriptions()
    }

    // ========================================================================
    // Host Events
    // ========================================================================

    /// Stream of host events: presence deliveries and state changes.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.core.event_bus.subscribe())
    }

    pub fn subscribe_events(&self) -> Receiver<BridgeEvent> {
        self.core.event_bus.subscribe()
    }
}

impl ReaderCore {
    async fn init(&self) -> Result<bool> {
        let _transition = self.transition_lock.lock().await;

        match self.lifecycle.current() {
            ReaderState::Ready => {
                debug!("Tag reader already initialized");
                return Ok(true);
            }
            ReaderState::Uninitialized | ReaderState::Failed => {}
            state => {
                return Err(CoreError::NotReady {
                    operation: Operation::InitTagReader,
                    state,
                })
            }
        }

        self.lifecycle.transition(ReaderState::Initializing)?;

        match self.bring_up().await {
            Ok(()) => {
                self.lifecycle.transition(ReaderState::Ready)?;
                info!("Tag reader initialized");
                Ok(true)
            }
            Err(e) => {
                self.dispatcher.close().await;
                self.lifecycle.transition(ReaderState::Failed)?;
                error!(code = e.code(), error = %e, "Tag reader initialization failed");
                Err(e)
            }
        }
    }

    async fn bring_up(&self) -> Result<()> {
        self.check_resources().await?;

        let sink = self.dispatcher.open();
        self.config
            .tag_service
            .open_session(sink)
            .await
            .map_err(InitError::Collaborator)?;

        if let Err(e) = self.dispatcher.start() {
            if let Err(close_err) = self.config.tag_service.close_session().await {
                warn!(error = %close_err, "Failed to close session after start failure");
            }
            return Err(InitError::Runtime(e).into());
        }

        Ok(())
    }

    async fn check_resources(&self) -> Result<()> {
        let Some(dir) = self.config.resource_dir() else {
            return Ok(());
        };

        let mut missing = Vec::new();
        let resources = self
            .config
            .required_resources
            .iter()
            .zip(self.config.required_resource_paths());
        for (name, path) in resources {
            match tokio::fs::try_exists(&path).await {
                Ok(true) => {}
                Ok(false) => missing.push(name.clone()),
                Err(e) => {
                    warn!(
                        file = %strip_path(&path.to_string_lossy()),
                        error = %e,
                        "Could not check required resource"
                    );
                    missing.push(name.clone());
                }
            }
        }

        if missing.is_empty() {
            return Ok(());
        }

        Err(InitError::ResourcesMissing {
            dir: dir.to_path_buf(),
            missing,
        }
        .into())
    }

    async fn deinit(&self) -> Result<bool> {
        let _transition = self.transition_lock.lock().await;

        match self.lifecycle.current() {
            ReaderState::Uninitialized => {
                debug!("Tag reader not initialized, nothing to tear down");
                Ok(true)
            }
            ReaderState::Ready => {
                self.lifecycle.transition(ReaderState::Deinitializing)?;
                let closed = self.config.tag_service.close_session().await;
                self.dispatcher.close().await;

                match closed {
                    Ok(()) => {
                        self.lifecycle.transition(ReaderState::Uninitialized)?;
                        info!("Tag reader deinitialized");
                        Ok(true)
                    }
                    Err(e) => {
                        self.lifecycle.transition(ReaderState::Failed)?;
                        error!(error = %e, "Tag reader deinitialization failed");
                        Err(CoreError::Deinit(e))
                    }
                }
            }
            ReaderState::Failed => {
                self.lifecycle.transition(ReaderState::Deinitializing)?;
                if let Err(e) = self.config.tag_service.close_session().await {
                    warn!(error = %e, "Ignoring teardown error of failed reader");
                }
                self.dispatcher.close().await;
                self.lifecycle.transition(ReaderState::Uninitialized)?;
                info!("Failed tag reader reset");
                Ok(true)
            }
            state => Err(CoreError::NotReady {
                operation: Operation::DeinitTagReader,
                state,
            }),
        }
    }

    /// Leaves a transient state whose transition task panicked or was
    /// aborted. The collaborator session is released by the next deinit.
    async fn recover_aborted_transition(&self) {
        let _transition = self.transition_lock.lock().await;

        let state = self.lifecycle.current();
        if !state.is_transient() {
            return;
        }

        self.dispatcher.close().await;
        if let Err(e) = self.lifecycle.transition(ReaderState::Failed) {
            error!(error = %e, state = %state, "Could not leave aborted transition");
        }
    }

    fn ensure_ready(&self, operation: Operation) -> Result<()> {
        let state = self.lifecycle.current();
        if state.is_ready() {
            Ok(())
        } else {
            debug!(operation = %operation, state = %state, "Rejecting call, reader not ready");
            Err(CoreError::NotReady { operation, state })
        }
    }
}

impl Drop for TagReaderService {
    fn drop(&mut self) {
        if self.core.lifecycle.current().is_ready() {
            warn!("Tag reader dropped while initialized; call deinit_tag_reader first");
        }
    }
}

fn publish(bus: &EventBus, event: BridgeEvent) {
    let name = event.name();
    if bus.emit(event).is_err() {
        debug!(event = name, "No host receiver for event");
    }
}

#[cfg(feature = "simulator-shims")]
mod simulated {
    use super::*;
    use bridge_simulator::{SimulatedTagService, SimulatorConfig};
    use bridge_traits::TagHardwareService;

    impl TagReaderService {
        /// Service backed by a [`SimulatedTagService`], returned alongside it
        /// so callers can drive presence and readings.
        pub fn with_simulator(
            simulator: SimulatorConfig,
        ) -> Result<(Self, Arc<SimulatedTagService>)> {
            let service = Arc::new(SimulatedTagService::new(simulator));
            let tag_service: Arc<dyn TagHardwareService> = service.clone();
            let config = BridgeConfig::builder().tag_service(tag_service).build()?;
            Ok((Self::new(config), service))
        }
    }
}

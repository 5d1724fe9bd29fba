//! # Event Dispatcher
//!
//! Moves presence events from the hardware service to the listeners in the
//! [`SubscriptionRegistry`].
//!
//! ## Overview
//!
//! The hardware service pushes events into a [`DispatchSink`] from whatever
//! thread its native callbacks run on. The sink only enqueues; a single
//! delivery task drains the queue and invokes listeners, so:
//!
//! - events are delivered in emission order, across both kinds
//!   (a disconnect is never overtaken by a later connect);
//! - a slow or failing listener never blocks or fails the emitter.
//!
//! ## Session Lifecycle
//!
//! ```text
//! open() ──> events queue up ──> start() ──> delivery ──> close()
//!                                                          │
//!                               queued events drained <────┘
//! ```
//!
//! [`open`](EventDispatcher::open) hands out the sink before the hardware
//! session exists, so events raised while the session is still opening are
//! kept. [`close`](EventDispatcher::close) stops intake, waits for everything
//! already queued to be delivered, then ends the task. Intake is a lock the
//! sink holds across its enqueue, so an `emit` racing `close` is either
//! queued ahead of the stop marker and delivered, or dropped without being
//! counted as accepted. Events emitted after `close` are dropped.
//!
//! ## Failure Isolation
//!
//! Each listener runs inside `catch_unwind`. An `Err` is logged at warn, a
//! panic at error; the remaining listeners still receive the event.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bridge_traits::tag::{TagEvent, TagEventSink};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::subscriptions::SubscriptionRegistry;

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Listeners that returned `Ok`.
    pub delivered: usize,
    /// Listeners that returned `Err` or panicked.
    pub failed: usize,
}

/// Counters of one closed queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSummary {
    /// Events the sink accepted while intake was open.
    pub accepted: u64,
    /// Events handed to listeners by the delivery task.
    pub dispatched: u64,
}

enum Command {
    Deliver(TagEvent),
    Stop,
}

struct Session {
    sender: UnboundedSender<Command>,
    intake: Arc<RwLock<bool>>,
    accepted: Arc<AtomicU64>,
    pending: Option<UnboundedReceiver<Command>>,
    worker: Option<JoinHandle<u64>>,
}

impl Session {
    fn sink(&self) -> Arc<dyn TagEventSink> {
        Arc::new(DispatchSink {
            sender: self.sender.clone(),
            intake: Arc::clone(&self.intake),
            accepted: Arc::clone(&self.accepted),
        })
    }
}

/// Queue-backed dispatcher owning the delivery task.
pub struct EventDispatcher {
    registry: Arc<SubscriptionRegistry>,
    session: Mutex<Option<Session>>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            registry,
            session: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Opens the event queue and returns the sink feeding it.
    ///
    /// Calling `open` again while a session exists returns a sink for the
    /// same queue.
    pub fn open(&self) -> Arc<dyn TagEventSink> {
        let mut session = self.session.lock();

        if let Some(current) = session.as_ref() {
            debug!("Event queue already open");
            return current.sink();
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let opened = Session {
            sender,
            intake: Arc::new(RwLock::new(true)),
            accepted: Arc::new(AtomicU64::new(0)),
            pending: Some(receiver),
            worker: None,
        };
        let sink = opened.sink();

        *session = Some(opened);
        debug!("Event queue opened");
        sink
    }

    /// Spawns the delivery task on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails when the queue is not open or no runtime is available.
    pub fn start(&self) -> Result<()> {
        let mut guard = self.session.lock();
        let session = guard
            .as_mut()
            .ok_or(Error::QueueClosed)?;

        let Some(receiver) = session.pending.take() else {
            debug!("Event delivery already running");
            return Ok(());
        };

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                session.pending = Some(receiver);
                return Err(Error::NoRuntime(e.to_string()));
            }
        };

        let registry = Arc::clone(&self.registry);
        session.worker = Some(handle.spawn(run_delivery(registry, receiver)));
        debug!("Event delivery started");
        Ok(())
    }

    /// Stops intake, delivers everything already queued, and ends the
    /// delivery task. Returns zero counts when the queue is not open.
    pub async fn close(&self) -> QueueSummary {
        let session = self.session.lock().take();
        let Some(session) = session else {
            return QueueSummary::default();
        };

        {
            // Waits out every emit that already passed the intake check.
            let mut intake = session.intake.write();
            *intake = false;
        }
        // Stop sits behind every accepted event.
        let _ = session.sender.send(Command::Stop);
        drop(session.pending);

        let dispatched = match session.worker {
            Some(worker) => match worker.await {
                Ok(dispatched) => dispatched,
                Err(e) => {
                    error!(error = %e, "Event delivery task ended abnormally");
                    0
                }
            },
            None => 0,
        };

        let summary = QueueSummary {
            accepted: session.accepted.load(Ordering::SeqCst),
            dispatched,
        };
        if summary.dispatched < summary.accepted {
            debug!(
                accepted = summary.accepted,
                dispatched = summary.dispatched,
                "Event queue closed with undelivered events"
            );
        } else {
            debug!(dispatched = summary.dispatched, "Event queue closed");
        }
        summary
    }

    pub fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .map(|session| session.worker.is_some())
            .unwrap_or(false)
    }

    /// Delivers `event` synchronously on the calling thread.
    pub fn deliver(&self, event: &TagEvent) -> DeliveryReport {
        deliver_to(&self.registry, event)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("registry", &self.registry)
            .field("open", &self.is_open())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Sink handed to the hardware service for one session.
pub struct DispatchSink {
    sender: UnboundedSender<Command>,
    intake: Arc<RwLock<bool>>,
    accepted: Arc<AtomicU64>,
}

impl TagEventSink for DispatchSink {
    fn emit(&self, event: TagEvent) {
        let open = self.intake.read();
        if !*open {
            debug!(kind = %event.kind(), "Event queue closed, dropping event");
            return;
        }

        trace!(kind = %event.kind(), "Event queued");
        if self.sender.send(Command::Deliver(event)).is_err() {
            debug!("Event delivery task gone, dropping event");
            return;
        }
        self.accepted.fetch_add(1, Ordering::SeqCst);
    }
}

async fn run_delivery(
    registry: Arc<SubscriptionRegistry>,
    mut queue: UnboundedReceiver<Command>,
) -> u64 {
    let mut dispatched = 0;
    while let Some(command) = queue.recv().await {
        match command {
            Command::Deliver(event) => {
                deliver_to(&registry, &event);
                dispatched += 1;
            }
            Command::Stop => break,
        }
    }
    debug!(dispatched, "Event delivery stopped");
    dispatched
}

fn deliver_to(registry: &SubscriptionRegistry, event: &TagEvent) -> DeliveryReport {
    let kind = event.kind();
    let mut report = DeliveryReport::default();

    for (id, listener) in registry.snapshot(kind) {
        // Removed by an earlier listener of this same delivery.
        if !registry.is_active(id) {
            continue;
        }

        match catch_unwind(AssertUnwindSafe(|| listener(event))) {
            Ok(Ok(())) => report.delivered += 1,
            Ok(Err(e)) => {
                warn!(subscription = %id, kind = %kind, error = %e, "Listener failed");
                report.failed += 1;
            }
            Err(payload) => {
                error!(
                    subscription = %id,
                    kind = %kind,
                    panic = %panic_message(payload.as_ref()),
                    "Listener panicked"
                );
                report.failed += 1;
            }
        }
    }

    debug!(
        kind = %kind,
        delivered = report.delivered,
        failed = report.failed,
        "Event dispatched"
    );
    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

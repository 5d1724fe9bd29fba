//! # Host Event Bus
//!
//! Out-of-band event channel from the bridge core to the host runtime, built
//! on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! Presence events reach Rust listeners through the
//! [`EventDispatcher`](crate::dispatcher::EventDispatcher). Listeners
//! registered through the host boundary (`addTagConnectedListener` and
//! friends) cannot hold a Rust closure, so their deliveries are turned into
//! [`BridgeEvent`] values and published here. The host adapter drains an
//! [`EventStream`] and forwards each event under its [`BridgeEvent::name`].
//!
//! ```text
//! ┌──────────────┐  deliver  ┌──────────────┐  emit   ┌──────────┐  recv  ┌──────────────┐
//! │  Dispatcher  ├──────────>│  forwarder   ├────────>│ EventBus ├───────>│ host adapter │
//! └──────────────┘           │ (per sub id) │         └──────────┘        └──────────────┘
//!                            └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{BridgeEvent, EventBus};
//! use core_runtime::subscriptions::SubscriptionId;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut receiver = bus.subscribe();
//!
//! bus.emit(BridgeEvent::TagDisconnected {
//!     subscription_id: SubscriptionId::from(2),
//! })
//! .ok();
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.name(), "tagDisconnected");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the host adapter fell behind and missed `n`
//!   events. Non-fatal; later events still arrive.
//! - **`RecvError::Closed`**: the bus was dropped, the service is gone.

use bridge_traits::tag::EventKind;
use core_schema::TagInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::subscriptions::SubscriptionId;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the host event channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Bridge Event Types
// ============================================================================

/// Event published to the host runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeEvent {
    /// A tag connected; delivered once per host connected-listener.
    #[serde(rename_all = "camelCase")]
    TagConnected {
        subscription_id: SubscriptionId,
        tag_info: TagInfo,
    },
    /// The tag disconnected; delivered once per host disconnected-listener.
    #[serde(rename_all = "camelCase")]
    TagDisconnected { subscription_id: SubscriptionId },
    /// The reader lifecycle moved to another state.
    #[serde(rename_all = "camelCase")]
    ReaderStateChanged { previous: String, current: String },
}

impl BridgeEvent {
    /// Event name used by the host event emitter.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::TagConnected { .. } => "tagConnected",
            BridgeEvent::TagDisconnected { .. } => "tagDisconnected",
            BridgeEvent::ReaderStateChanged { .. } => "readerStateChanged",
        }
    }

    /// Presence kind carried by the event, if it is a presence event.
    pub fn event_kind(&self) -> Option<EventKind> {
        match self {
            BridgeEvent::TagConnected { .. } => Some(EventKind::TagConnected),
            BridgeEvent::TagDisconnected { .. } => Some(EventKind::TagDisconnected),
            BridgeEvent::ReaderStateChanged { .. } => None,
        }
    }

    /// Subscription a presence event was delivered for.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        match self {
            BridgeEvent::TagConnected {
                subscription_id, ..
            }
            | BridgeEvent::TagDisconnected { subscription_id } => Some(*subscription_id),
            BridgeEvent::ReaderStateChanged { .. } => None,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel of [`BridgeEvent`]s.
///
/// Cloning the bus yields another producer on the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per receiver.
    ///
    /// A receiver that falls further behind gets `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to every receiver.
    ///
    /// Returns the number of receivers, or an error when there are none.
    pub fn emit(&self, event: BridgeEvent) -> Result<usize, SendError<BridgeEvent>> {
        self.sender.send(event)
    }

    /// New receiver of all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&BridgeEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{BridgeEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(100);
/// let presence_only = EventStream::new(bus.subscribe())
///     .filter(|event| event.event_kind().is_some());
/// ```
pub struct EventStream {
    receiver: Receiver<BridgeEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<BridgeEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&BridgeEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the stream fell behind by `n` events
    /// and `RecvError::Closed` once the bus is gone.
    pub async fn recv(&mut self) -> Result<BridgeEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Receives without waiting. `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<BridgeEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

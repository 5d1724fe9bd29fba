//! Tag Hardware Abstraction
//!
//! Contract between the bridge core and the native component that talks to
//! the NFC reader and the sensor tag firmware.

use std::fmt;
use std::sync::Arc;

use core_schema::{SensorReading, TagConfiguration, TagInfo};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of a presence event, used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    TagConnected,
    TagDisconnected,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::TagConnected => f.write_str("tagConnected"),
            EventKind::TagDisconnected => f.write_str("tagDisconnected"),
        }
    }
}

/// Presence change reported by the hardware service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEvent {
    /// A tag entered the reader field.
    Connected(TagInfo),
    /// The tag left the reader field. Downstream caches of capabilities and
    /// state must be cleared.
    Disconnected,
}

impl TagEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TagEvent::Connected(_) => EventKind::TagConnected,
            TagEvent::Disconnected => EventKind::TagDisconnected,
        }
    }
}

/// Receiver for presence events, handed to the hardware service when a
/// session opens.
///
/// `emit` may be called from any thread, including native callback threads
/// outside the async runtime, and must not block.
pub trait TagEventSink: Send + Sync {
    fn emit(&self, event: TagEvent);
}

/// Tag hardware service trait
///
/// Implemented by each platform:
/// - **Android**: NFC adapter plus the vendor tag library
/// - **iOS**: Core NFC session plus the vendor tag library
/// - **Desktop/tests**: `bridge-simulator`
///
/// The core never parses raw tag bytes; it only moves validated
/// configuration in and buffered readings out.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::tag::TagHardwareService;
///
/// async fn dump(service: &dyn TagHardwareService) -> Result<()> {
///     let config = service.read_config().await?;
///     let readings = service.pull_readings(100).await?;
///     println!("{:?} / {} readings", config, readings.len());
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait TagHardwareService: Send + Sync {
    /// Open a reader session. Presence events for the lifetime of the
    /// session are pushed into `events`.
    async fn open_session(&self, events: Arc<dyn TagEventSink>) -> Result<()>;

    /// Close the reader session and release the reader. After this returns
    /// no further events are emitted.
    async fn close_session(&self) -> Result<()>;

    /// Write a configuration to the connected tag.
    ///
    /// Returns whether the tag accepted it.
    async fn push_config(&self, config: &TagConfiguration) -> Result<bool>;

    /// Read the configuration currently stored on the tag. Tags that were
    /// never configured report their defaults.
    async fn read_config(&self) -> Result<TagConfiguration>;

    /// Pull at most `limit` buffered readings.
    async fn pull_readings(&self, limit: usize) -> Result<Vec<SensorReading>>;
}

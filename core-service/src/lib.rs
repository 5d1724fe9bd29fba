//! Core service façade for the sensor tag bridge.
//!
//! This crate exposes [`TagReaderService`], the surface the host bridge
//! calls: reader lifecycle, tag configuration, data pulls and presence
//! listeners. The hardware itself sits behind
//! [`bridge_traits::TagHardwareService`]; platform builds inject their NFC
//! backed implementation, whereas desktop builds and tests enable the
//! `simulator-shims` feature and run against `bridge-simulator`.

pub mod error;
pub mod lifecycle;
mod reader;

pub use error::{CoreError, HostError, InitError, Operation, Result};
pub use lifecycle::ReaderState;
pub use reader::TagReaderService;

pub use bridge_traits::{EventKind, TagEvent};
pub use core_runtime::config::{BridgeConfig, BridgeConfigBuilder};
pub use core_runtime::events::{BridgeEvent, EventStream};
pub use core_runtime::subscriptions::{Subscription, SubscriptionId};

#[cfg(feature = "simulator-shims")]
pub use bridge_simulator::{SimulatedTagService, SimulatorConfig};

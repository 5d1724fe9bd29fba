//! # Simulated Tag Hardware
//!
//! Default implementation of the tag hardware bridge for desktop builds,
//! demos and tests, where no NFC reader is attached.
//!
//! ## Overview
//!
//! [`SimulatedTagService`] implements
//! [`TagHardwareService`](bridge_traits::TagHardwareService) against
//! in-memory state:
//! - a stored [`TagConfiguration`](core_schema::TagConfiguration), initially
//!   the factory default (60 s interval, 0 s delay, 3600 s running time,
//!   -10..50 °C)
//! - a buffer of readings, seeded with two temperature samples
//! - optional automatic presence events after a session opens: a connect
//!   after one second, a disconnect after three
//!
//! Tests drive presence manually with
//! [`simulate_connect`](SimulatedTagService::simulate_connect) /
//! [`simulate_disconnect`](SimulatedTagService::simulate_disconnect) and make
//! `open_session` fail with
//! [`set_available(false)`](SimulatedTagService::set_available).
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_simulator::{SimulatedTagService, SimulatorConfig};
//! use std::sync::Arc;
//!
//! let service = Arc::new(SimulatedTagService::new(
//!     SimulatorConfig::default().with_auto_events(false),
//! ));
//! let config = core_runtime::config::BridgeConfig::builder()
//!     .tag_service(service.clone())
//!     .build()?;
//! ```

mod simulator;

pub use simulator::{SimulatedTagService, SimulatorConfig, SimulatorStats};

//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the bridge core and the
//! platform-specific pieces it cannot implement itself. Each trait is a
//! capability the core requires but that every platform (Android, iOS,
//! desktop simulator) provides differently.
//!
//! ## Traits
//!
//! ### Tag hardware
//! - [`TagHardwareService`](tag::TagHardwareService) - Reader sessions, tag configuration, buffered readings
//! - [`TagEventSink`](tag::TagEventSink) - Push channel for connect/disconnect signals
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation | Status |
//! |----------|----------------|--------|
//! | Desktop / tests | `bridge-simulator` | ✅ Available |
//! | Android  | NFC adapter + vendor tag library | 📋 Planned |
//! | iOS      | Core NFC + vendor tag library    | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert native failures into it with an actionable
//! message; the core wraps it with the failing operation before surfacing it
//! to the host.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`. Hardware callbacks usually fire on
//! a native thread while the host awaits on the async runtime, so
//! implementations must tolerate concurrent calls.

pub mod error;
pub mod tag;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use tag::{EventKind, TagEvent, TagEventSink, TagHardwareService};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};

//! Workspace placeholder crate.
//!
//! This crate exposes the feature flags that map to the individual workspace
//! crates (`core-service`, `bridge-simulator`). Host applications can depend on
//! `tag-bridge-workspace` and enable the documented features without wiring
//! each crate individually.
//!
//! - `simulator-shims` (default): the service plus the simulated tag hardware.
//! - `host`: the service only; the host injects its own `TagHardwareService`.

#[cfg(any(feature = "simulator-shims", feature = "host"))]
pub use core_service::{CoreError, ReaderState, TagReaderService};

#[cfg(feature = "simulator-shims")]
pub use bridge_simulator::SimulatedTagService;

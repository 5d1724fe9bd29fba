//! # Core Runtime Module
//!
//! Provides the runtime infrastructure of the sensor tag bridge:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Subscription registry for tag presence listeners
//! - Ordered event dispatch from the hardware service to listeners
//! - Host event bus carrying out-of-band events to the application
//!
//! ## Overview
//!
//! Hardware signals arrive on arbitrary threads through a
//! [`TagEventSink`](bridge_traits::tag::TagEventSink). The
//! [`EventDispatcher`](dispatcher::EventDispatcher) queues them in arrival
//! order and delivers each one to the listeners the
//! [`SubscriptionRegistry`](subscriptions::SubscriptionRegistry) holds for its
//! kind. Listeners registered from the host boundary forward deliveries to the
//! [`EventBus`](events::EventBus).

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod logging;
pub mod subscriptions;

pub use error::{Error, Result};

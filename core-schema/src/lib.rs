//! # Sensor Tag Schema
//!
//! Wire shapes exchanged between the host application, the bridge core and the
//! tag hardware service.
//!
//! ## Overview
//!
//! - [`config`]: measurement, temperature, humidity and accelerometer settings
//!   with validation predicates
//! - [`reading`]: timestamped sensor samples and the partitioned
//!   [`SensorData`](reading::SensorData) batch returned by `getData`
//! - [`tag`]: the [`TagInfo`](tag::TagInfo) snapshot taken when a tag connects
//!
//! Every type serializes to camelCase JSON so the same values can cross the
//! host bridge unchanged. Validation is pure: nothing in this crate performs
//! I/O.

pub mod config;
pub mod error;
pub mod reading;
pub mod tag;

pub use config::{
    AccelerometerConfig, HumidityConfig, MeasurementConfig, ShakeThresholds, ShockThresholds,
    TagConfiguration, TemperatureConfig, TiltThresholds, VibrationThresholds,
};
pub use error::ValidationError;
pub use reading::{
    AccelerometerReading, EventReading, HumidityReading, ReadingKind, SensorData, SensorReading,
    TemperatureReading,
};
pub use tag::TagInfo;

//! Sensor readings
//!
//! A tag logs samples of several kinds. The hardware service hands them over
//! as a flat batch of [`SensorReading`] values; [`SensorData`] partitions such a
//! batch by kind for the host. Kinds without samples are left out of the
//! serialized result entirely instead of being sent as empty arrays.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Temperature sample in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub temperature: f64,
}

/// Relative humidity sample in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HumidityReading {
    pub timestamp: f64,
    pub humidity: f64,
}

/// Acceleration sample, one value per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerReading {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Detector event recorded by the tag (shock, shake, tilt, ...).
///
/// The payload layout depends on `event_type` and is passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReading {
    pub timestamp: f64,
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Kind of a [`SensorReading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadingKind {
    Temperature,
    Humidity,
    Accelerometer,
    Event,
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadingKind::Temperature => "temperature",
            ReadingKind::Humidity => "humidity",
            ReadingKind::Accelerometer => "accelerometer",
            ReadingKind::Event => "event",
        };
        f.write_str(name)
    }
}

/// One timestamped sample of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SensorReading {
    Temperature(TemperatureReading),
    Humidity(HumidityReading),
    Accelerometer(AccelerometerReading),
    Event(EventReading),
}

impl SensorReading {
    pub fn kind(&self) -> ReadingKind {
        match self {
            SensorReading::Temperature(_) => ReadingKind::Temperature,
            SensorReading::Humidity(_) => ReadingKind::Humidity,
            SensorReading::Accelerometer(_) => ReadingKind::Accelerometer,
            SensorReading::Event(_) => ReadingKind::Event,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            SensorReading::Temperature(r) => r.timestamp,
            SensorReading::Humidity(r) => r.timestamp,
            SensorReading::Accelerometer(r) => r.timestamp,
            SensorReading::Event(r) => r.timestamp,
        }
    }

    pub fn temperature(timestamp: f64, temperature: f64) -> Self {
        SensorReading::Temperature(TemperatureReading {
            timestamp,
            temperature,
        })
    }

    pub fn humidity(timestamp: f64, humidity: f64) -> Self {
        SensorReading::Humidity(HumidityReading {
            timestamp,
            humidity,
        })
    }

    pub fn accelerometer(timestamp: f64, x: f64, y: f64, z: f64) -> Self {
        SensorReading::Accelerometer(AccelerometerReading { timestamp, x, y, z })
    }

    pub fn event(timestamp: f64, event_type: impl Into<String>, data: serde_json::Value) -> Self {
        SensorReading::Event(EventReading {
            timestamp,
            event_type: event_type.into(),
            data,
        })
    }
}

/// A bounded batch of readings partitioned by kind, as returned by `getData`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_data: Option<Vec<TemperatureReading>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity_data: Option<Vec<HumidityReading>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerometer_data: Option<Vec<AccelerometerReading>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data: Option<Vec<EventReading>>,
}

impl SensorData {
    /// Partitions readings by kind. Each sequence is ordered by timestamp;
    /// samples sharing a timestamp keep their original order.
    pub fn from_readings<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = SensorReading>,
    {
        let mut temperature = Vec::new();
        let mut humidity = Vec::new();
        let mut accelerometer = Vec::new();
        let mut events = Vec::new();

        for reading in readings {
            match reading {
                SensorReading::Temperature(r) => temperature.push(r),
                SensorReading::Humidity(r) => humidity.push(r),
                SensorReading::Accelerometer(r) => accelerometer.push(r),
                SensorReading::Event(r) => events.push(r),
            }
        }

        temperature.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        humidity.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        accelerometer.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        Self {
            temperature_data: non_empty(temperature),
            humidity_data: non_empty(humidity),
            accelerometer_data: non_empty(accelerometer),
            event_data: non_empty(events),
        }
    }

    /// Total number of readings across all kinds.
    pub fn len(&self) -> usize {
        self.temperature_data.as_ref().map_or(0, Vec::len)
            + self.humidity_data.as_ref().map_or(0, Vec::len)
            + self.accelerometer_data.as_ref().map_or(0, Vec::len)
            + self.event_data.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kinds present in this batch.
    pub fn kinds(&self) -> Vec<ReadingKind> {
        let mut kinds = Vec::new();
        if self.temperature_data.is_some() {
            kinds.push(ReadingKind::Temperature);
        }
        if self.humidity_data.is_some() {
            kinds.push(ReadingKind::Humidity);
        }
        if self.accelerometer_data.is_some() {
            kinds.push(ReadingKind::Accelerometer);
        }
        if self.event_data.is_some() {
            kinds.push(ReadingKind::Event);
        }
        kinds
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

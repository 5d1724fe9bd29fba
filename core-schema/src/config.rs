//! Tag configuration models
//!
//! Settings written to a sensor tag by `setConfig` and read back by
//! `getConfig`. Each model carries a `validate()` predicate that reports the
//! first offending field; [`TagConfiguration::validate`] checks every present
//! part and prefixes the field path with the part's wire name.
//!
//! ```
//! use core_schema::config::{MeasurementConfig, TemperatureConfig, TagConfiguration};
//!
//! let config = TagConfiguration::new(
//!     MeasurementConfig::new(60, 0, 3600),
//!     TemperatureConfig::new(-10.0, 50.0),
//! );
//! assert!(config.validate().is_ok());
//!
//! let err = MeasurementConfig::new(60, 0, 30).validate().unwrap_err();
//! assert_eq!(err.field, "runningTime");
//! ```

use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};

// =============================================================================
// Measurement
// =============================================================================

/// Logging schedule of the tag, all values in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementConfig {
    /// Time between two samples. Must be greater than zero.
    pub interval: u32,
    /// Delay before the first sample is taken.
    pub start_delay: u32,
    /// Total logging duration. Must cover at least one interval.
    pub running_time: u32,
}

impl MeasurementConfig {
    pub fn new(interval: u32, start_delay: u32, running_time: u32) -> Self {
        Self {
            interval,
            start_delay,
            running_time,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(ValidationError::new(
                "interval",
                "must be greater than 0 seconds",
            ));
        }

        if self.running_time == 0 {
            return Err(ValidationError::new(
                "runningTime",
                "must be greater than 0 seconds",
            ));
        }

        if self.running_time < self.interval {
            return Err(ValidationError::new(
                "runningTime",
                format!(
                    "{}s is shorter than the measurement interval of {}s",
                    self.running_time, self.interval
                ),
            ));
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Number of samples the schedule produces.
    pub fn expected_samples(&self) -> u32 {
        if self.interval == 0 {
            return 0;
        }
        self.running_time / self.interval
    }
}

// =============================================================================
// Valid ranges (temperature, humidity)
// =============================================================================

fn validate_range(minimum: f64, maximum: f64) -> Result<()> {
    if !minimum.is_finite() {
        return Err(ValidationError::new("validMinimum", "must be a finite number"));
    }

    if !maximum.is_finite() {
        return Err(ValidationError::new("validMaximum", "must be a finite number"));
    }

    if minimum >= maximum {
        return Err(ValidationError::new(
            "validMinimum",
            format!("{} must be lower than validMaximum {}", minimum, maximum),
        ));
    }

    Ok(())
}

/// Temperature window in degrees Celsius outside of which the tag flags a
/// sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureConfig {
    pub valid_minimum: f64,
    pub valid_maximum: f64,
}

impl TemperatureConfig {
    pub fn new(valid_minimum: f64, valid_maximum: f64) -> Self {
        Self {
            valid_minimum,
            valid_maximum,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_range(self.valid_minimum, self.valid_maximum)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Relative humidity window in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumidityConfig {
    pub valid_minimum: f64,
    pub valid_maximum: f64,
}

impl HumidityConfig {
    pub fn new(valid_minimum: f64, valid_maximum: f64) -> Self {
        Self {
            valid_minimum,
            valid_maximum,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_range(self.valid_minimum, self.valid_maximum)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

// =============================================================================
// Accelerometer
// =============================================================================

fn ensure_threshold(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(ValidationError::new(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(ValidationError::new(
            field,
            format!("{} must not be negative", value),
        ));
    }
    Ok(())
}

fn ensure_thresholds(group: &str, values: &[(&str, f64)]) -> Result<()> {
    for (field, value) in values {
        ensure_threshold(field, *value).map_err(|err| err.within(group))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShockThresholds {
    pub amplitude: f64,
    pub wait_time: f64,
    pub ringing_amplitude: f64,
    pub ringing_count: f64,
    pub ringing_duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShakeThresholds {
    pub amplitude: f64,
    pub count: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibrationThresholds {
    pub amplitude: f64,
    pub frequency: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TiltThresholds {
    pub wait_time: f64,
}

/// Motion detection thresholds, grouped by detector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccelerometerConfig {
    pub shock: ShockThresholds,
    pub shake: ShakeThresholds,
    pub vibration: VibrationThresholds,
    pub tilt: TiltThresholds,
}

impl AccelerometerConfig {
    pub fn validate(&self) -> Result<()> {
        let shock = &self.shock;
        ensure_thresholds(
            "shock",
            &[
                ("amplitude", shock.amplitude),
                ("waitTime", shock.wait_time),
                ("ringingAmplitude", shock.ringing_amplitude),
                ("ringingCount", shock.ringing_count),
                ("ringingDuration", shock.ringing_duration),
            ],
        )?;

        let shake = &self.shake;
        ensure_thresholds(
            "shake",
            &[
                ("amplitude", shake.amplitude),
                ("count", shake.count),
                ("duration", shake.duration),
            ],
        )?;

        let vibration = &self.vibration;
        ensure_thresholds(
            "vibration",
            &[
                ("amplitude", vibration.amplitude),
                ("frequency", vibration.frequency),
                ("duration", vibration.duration),
            ],
        )?;

        ensure_thresholds("tilt", &[("waitTime", self.tilt.wait_time)])
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

// =============================================================================
// Full configuration
// =============================================================================

/// Complete configuration set, as pushed by `setConfig` and returned by
/// `getConfig`. Optional parts are omitted from the serialized form when
/// absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagConfiguration {
    pub measurement_config: MeasurementConfig,
    pub temperature_config: TemperatureConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity_config: Option<HumidityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerometer_config: Option<AccelerometerConfig>,
}

impl TagConfiguration {
    pub fn new(measurement_config: MeasurementConfig, temperature_config: TemperatureConfig) -> Self {
        Self {
            measurement_config,
            temperature_config,
            humidity_config: None,
            accelerometer_config: None,
        }
    }

    pub fn with_humidity(mut self, humidity_config: HumidityConfig) -> Self {
        self.humidity_config = Some(humidity_config);
        self
    }

    pub fn with_accelerometer(mut self, accelerometer_config: AccelerometerConfig) -> Self {
        self.accelerometer_config = Some(accelerometer_config);
        self
    }

    /// Validates every present part, reporting the first failure.
    pub fn validate(&self) -> Result<()> {
        self.measurement_config
            .validate()
            .map_err(|err| err.within("measurementConfig"))?;

        self.temperature_config
            .validate()
            .map_err(|err| err.within("temperatureConfig"))?;

        if let Some(humidity) = &self.humidity_config {
            humidity
                .validate()
                .map_err(|err| err.within("humidityConfig"))?;
        }

        if let Some(accelerometer) = &self.accelerometer_config {
            accelerometer
                .validate()
                .map_err(|err| err.within("accelerometerConfig"))?;
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl Default for TagConfiguration {
    /// Factory settings reported by a tag that was never configured.
    fn default() -> Self {
        Self::new(
            MeasurementConfig::new(60, 0, 3600),
            TemperatureConfig::new(-10.0, 50.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_config_valid() {
        let config = MeasurementConfig::new(60, 0, 3600);
        assert!(config.is_valid());
        assert_eq!(config.expected_samples(), 60);
    }

    #[test]
    fn test_measurement_running_time_shorter_than_interval() {
        let err = MeasurementConfig::new(60, 0, 30).validate().unwrap_err();
        assert_eq!(err.field, "runningTime");
        assert!(err.reason.contains("shorter"));
    }

    #[test]
    fn test_measurement_zero_interval() {
        let err = MeasurementConfig::new(0, 0, 3600).validate().unwrap_err();
        assert_eq!(err.field, "interval");
    }

    #[test]
    fn test_measurement_running_time_equal_to_interval() {
        assert!(MeasurementConfig::new(60, 10, 60).is_valid());
    }

    #[test]
    fn test_temperature_range() {
        assert!(TemperatureConfig::new(-10.0, 50.0).is_valid());
        assert!(!TemperatureConfig::new(50.0, 50.0).is_valid());
        assert!(!TemperatureConfig::new(60.0, -10.0).is_valid());

        let err = TemperatureConfig::new(f64::NAN, 10.0).validate().unwrap_err();
        assert_eq!(err.field, "validMinimum");

        let err = TemperatureConfig::new(0.0, f64::INFINITY)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "validMaximum");
    }

    #[test]
    fn test_accelerometer_negative_threshold() {
        let mut config = AccelerometerConfig::default();
        assert!(config.is_valid());

        config.vibration.frequency = -1.0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "vibration.frequency");
    }

    #[test]
    fn test_tag_configuration_field_paths() {
        let config = TagConfiguration::new(
            MeasurementConfig::new(60, 0, 30),
            TemperatureConfig::new(-10.0, 50.0),
        );
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "measurementConfig.runningTime");

        let mut accelerometer = AccelerometerConfig::default();
        accelerometer.tilt.wait_time = -5.0;
        let config = TagConfiguration::default()
            .with_humidity(HumidityConfig::new(20.0, 80.0))
            .with_accelerometer(accelerometer);
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "accelerometerConfig.tilt.waitTime");
        assert_eq!(
            err.to_string(),
            "Invalid accelerometerConfig.tilt.waitTime: -5 must not be negative"
        );
    }

    #[test]
    fn test_humidity_reported_under_its_prefix() {
        let config = TagConfiguration::default().with_humidity(HumidityConfig::new(80.0, 20.0));
        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "humidityConfig.validMinimum");
    }

    #[test]
    fn test_wire_format() {
        let config = TagConfiguration::default();
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["measurementConfig"]["runningTime"], 3600);
        assert_eq!(json["measurementConfig"]["startDelay"], 0);
        assert_eq!(json["temperatureConfig"]["validMinimum"], -10.0);
        assert!(json.get("humidityConfig").is_none());
        assert!(json.get("accelerometerConfig").is_none());
    }

    #[test]
    fn test_deserialize_host_payload() {
        let payload = r#"{
            "measurementConfig": { "interval": 120, "startDelay": 30, "runningTime": 7200 },
            "temperatureConfig": { "validMinimum": 2.0, "validMaximum": 8.0 },
            "accelerometerConfig": {
                "shock": { "amplitude": 4.0, "waitTime": 1.0, "ringingAmplitude": 0.5, "ringingCount": 3, "ringingDuration": 10 },
                "shake": { "amplitude": 2.0, "count": 5, "duration": 100 },
                "vibration": { "amplitude": 1.0, "frequency": 50, "duration": 200 },
                "tilt": { "waitTime": 5 }
            }
        }"#;

        let config: TagConfiguration = serde_json::from_str(payload).unwrap();
        assert_eq!(config.measurement_config.interval, 120);
        assert!(config.humidity_config.is_none());
        let accelerometer = config.accelerometer_config.unwrap();
        assert_eq!(accelerometer.shock.ringing_count, 3.0);
        assert_eq!(accelerometer.tilt.wait_time, 5.0);
        assert!(config.is_valid());
    }
}

//! Engine configuration: alert thresholds and timer intervals.

use std::time::Duration;

use hardhat_types::SensorType;
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;
use crate::log::DEFAULT_LOG_RETENTION;

/// Critical/normal thresholds for one sensor.
///
/// A reading at or above `critical` is critical, at or below `normal` is
/// normal, and anything in between is the dead band where no alert fires.
/// Single-threshold sensors use the same value for both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorThreshold {
    pub critical: f64,
    pub normal: f64,
}

impl SensorThreshold {
    pub const fn new(critical: f64, normal: f64) -> Self {
        Self { critical, normal }
    }

    /// A threshold with no dead band.
    pub const fn single(threshold: f64) -> Self {
        Self {
            critical: threshold,
            normal: threshold,
        }
    }
}

/// Thresholds for every sensor the gear carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub body_temperature: SensorThreshold,
    pub environmental_temperature: SensorThreshold,
    pub smoke_sensor: SensorThreshold,
    pub toxic_gas_sensor: SensorThreshold,
    pub heart_rate: SensorThreshold,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            body_temperature: SensorThreshold::new(38.0, 37.5),
            environmental_temperature: SensorThreshold::new(45.0, 40.0),
            smoke_sensor: SensorThreshold::single(300.0),
            toxic_gas_sensor: SensorThreshold::single(50.0),
            heart_rate: SensorThreshold::new(120.0, 100.0),
        }
    }
}

impl Thresholds {
    /// Thresholds for a given sensor.
    pub fn get(&self, sensor: SensorType) -> SensorThreshold {
        match sensor {
            SensorType::BodyTemperature => self.body_temperature,
            SensorType::EnvironmentalTemperature => self.environmental_temperature,
            SensorType::SmokeSensor => self.smoke_sensor,
            SensorType::ToxicGasSensor => self.toxic_gas_sensor,
            SensorType::HeartRate => self.heart_rate,
        }
    }

    /// Replace the thresholds for one sensor.
    pub fn set(&mut self, sensor: SensorType, threshold: SensorThreshold) {
        let slot = match sensor {
            SensorType::BodyTemperature => &mut self.body_temperature,
            SensorType::EnvironmentalTemperature => &mut self.environmental_temperature,
            SensorType::SmokeSensor => &mut self.smoke_sensor,
            SensorType::ToxicGasSensor => &mut self.toxic_gas_sensor,
            SensorType::HeartRate => &mut self.heart_rate,
        };
        *slot = threshold;
    }

    /// Reject non-finite values and tables where `normal` exceeds `critical`.
    pub fn validate(&self) -> Result<(), MonitorError> {
        for sensor in SensorType::ALL {
            let t = self.get(sensor);
            if !t.critical.is_finite() || !t.normal.is_finite() {
                return Err(MonitorError::InvalidConfig(format!(
                    "{} thresholds must be finite",
                    sensor
                )));
            }
            if t.normal > t.critical {
                return Err(MonitorError::InvalidConfig(format!(
                    "{} normal threshold {} is above critical threshold {}",
                    sensor, t.normal, t.critical
                )));
            }
        }
        Ok(())
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How long a stream may go without a reading before it is timed out.
    #[serde(rename = "staleness_window_ms", with = "millis")]
    pub staleness_window: Duration,

    /// Period between recording saves.
    #[serde(rename = "recording_interval_ms", with = "millis")]
    pub recording_interval: Duration,

    /// Saved notifications kept in the local log.
    pub log_retention: usize,

    pub thresholds: Thresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            staleness_window: Duration::from_secs(30),
            recording_interval: Duration::from_secs(5),
            log_retention: DEFAULT_LOG_RETENTION,
            thresholds: Thresholds::default(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.staleness_window.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "staleness window must be greater than zero".to_string(),
            ));
        }
        if self.recording_interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "recording interval must be greater than zero".to_string(),
            ));
        }
        self.thresholds.validate()
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

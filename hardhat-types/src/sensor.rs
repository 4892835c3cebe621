//! Sensor kinds carried by the hard hat and their alert conditions.

use std::fmt;
use std::str::FromStr;

/// A sensor stream reported by the gear.
///
/// Each variant maps to a stable camelCase wire key, which is what the gear
/// streams and what ends up in persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum SensorType {
    BodyTemperature,
    EnvironmentalTemperature,
    SmokeSensor,
    ToxicGasSensor,
    HeartRate,
}

impl SensorType {
    /// Every sensor, in the order records and status views list them.
    pub const ALL: [SensorType; 5] = [
        SensorType::BodyTemperature,
        SensorType::EnvironmentalTemperature,
        SensorType::SmokeSensor,
        SensorType::ToxicGasSensor,
        SensorType::HeartRate,
    ];

    /// The wire key, e.g. `"bodyTemperature"`.
    pub fn key(&self) -> &'static str {
        match self {
            SensorType::BodyTemperature => "bodyTemperature",
            SensorType::EnvironmentalTemperature => "environmentalTemperature",
            SensorType::SmokeSensor => "smokeSensor",
            SensorType::ToxicGasSensor => "toxicGasSensor",
            SensorType::HeartRate => "heartRate",
        }
    }

    /// Human-readable name used in notification messages.
    pub fn label(&self) -> &'static str {
        match self {
            SensorType::BodyTemperature => "Body Temperature",
            SensorType::EnvironmentalTemperature => "Environmental Temperature",
            SensorType::SmokeSensor => "Smoke",
            SensorType::ToxicGasSensor => "Toxic Gas",
            SensorType::HeartRate => "Heart Rate",
        }
    }

    /// Measurement unit for display.
    pub fn unit(&self) -> &'static str {
        match self {
            SensorType::BodyTemperature | SensorType::EnvironmentalTemperature => "°C",
            SensorType::SmokeSensor | SensorType::ToxicGasSensor => "ppm",
            SensorType::HeartRate => "bpm",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when a wire key names no known sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSensorError(pub String);

impl fmt::Display for ParseSensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sensor type: {}", self.0)
    }
}

impl std::error::Error for ParseSensorError {}

impl FromStr for SensorType {
    type Err = ParseSensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .into_iter()
            .find(|sensor| sensor.key() == s)
            .ok_or_else(|| ParseSensorError(s.to_string()))
    }
}

/// Alert condition of a sensor reading relative to its thresholds.
///
/// Also used as the per-stream notification flag: the last condition an
/// alert was emitted for. `None` means no alert has been emitted yet, or the
/// reading sits between the normal and critical thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Condition {
    #[default]
    None,
    Normal,
    Critical,
}

impl Condition {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Condition::None => "-",
            Condition::Normal => "OK",
            Condition::Critical => "CRIT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_back() {
        for sensor in SensorType::ALL {
            assert_eq!(sensor.key().parse::<SensorType>(), Ok(sensor));
        }
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = "co2".parse::<SensorType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown sensor type: co2");
    }

    #[test]
    fn condition_defaults_to_none() {
        assert_eq!(Condition::default(), Condition::None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_wire_keys() {
        let json = serde_json::to_string(&SensorType::ToxicGasSensor).unwrap();
        assert_eq!(json, "\"toxicGasSensor\"");

        let parsed: Condition = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(parsed, Condition::Critical);
    }
}

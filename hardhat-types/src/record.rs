//! RealtimeRecord - a point-in-time snapshot of one person's sensors.

use std::collections::BTreeMap;

use crate::{current_timestamp_ms, SensorType};

/// A periodic snapshot of a person's sensor values.
///
/// Recording sessions append one of these to the person's durable record on
/// every tick. Every sensor is present in `values`; a sensor with no reading
/// yet is stored as `None` rather than omitted.
///
/// # Example
///
/// ```rust
/// use hardhat_types::{RealtimeRecord, SensorType};
///
/// let record = RealtimeRecord::builder()
///     .value(SensorType::SmokeSensor, 12.0)
///     .date("2024-03-01")
///     .time("14:05:09")
///     .build();
///
/// assert_eq!(record.get(SensorType::SmokeSensor), Some(12.0));
/// assert_eq!(record.get(SensorType::HeartRate), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RealtimeRecord {
    /// Unix timestamp in milliseconds when this snapshot was taken.
    pub timestamp_ms: u64,

    /// Local calendar date, `YYYY-MM-DD`.
    pub date: String,

    /// Local wall-clock time, `HH:MM:SS`.
    pub time: String,

    /// Latest value per sensor at snapshot time.
    pub values: BTreeMap<SensorType, Option<f64>>,
}

impl RealtimeRecord {
    /// Create a builder for constructing records.
    pub fn builder() -> RealtimeRecordBuilder {
        RealtimeRecordBuilder::new()
    }

    /// Value recorded for a sensor, `None` if it had no reading.
    pub fn get(&self, sensor: SensorType) -> Option<f64> {
        self.values.get(&sensor).copied().flatten()
    }

    /// Number of sensors that had a reading.
    pub fn reported(&self) -> usize {
        self.values.values().filter(|v| v.is_some()).count()
    }
}

/// Builder for constructing `RealtimeRecord` instances.
#[derive(Debug)]
pub struct RealtimeRecordBuilder {
    timestamp_ms: Option<u64>,
    date: String,
    time: String,
    values: BTreeMap<SensorType, Option<f64>>,
}

impl RealtimeRecordBuilder {
    /// Create a new builder with every sensor unset.
    pub fn new() -> Self {
        Self {
            timestamp_ms: None,
            date: String::new(),
            time: String::new(),
            values: SensorType::ALL.into_iter().map(|s| (s, None)).collect(),
        }
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn time(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }

    /// Set a sensor value.
    pub fn value(mut self, sensor: SensorType, value: f64) -> Self {
        self.values.insert(sensor, Some(value));
        self
    }

    /// Set a sensor value that may be absent.
    pub fn maybe_value(mut self, sensor: SensorType, value: Option<f64>) -> Self {
        self.values.insert(sensor, value);
        self
    }

    /// Build the record.
    pub fn build(self) -> RealtimeRecord {
        RealtimeRecord {
            timestamp_ms: self.timestamp_ms.unwrap_or_else(current_timestamp_ms),
            date: self.date,
            time: self.time,
            values: self.values,
        }
    }
}

impl Default for RealtimeRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Latest sensor value per (gear, sensor).

use std::collections::BTreeMap;

use hardhat_types::{current_timestamp_ms, SensorType};
use parking_lot::RwLock;

/// The most recent sample of one stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// `None` when the gear reported the sensor without a usable value.
    pub value: Option<f64>,
    /// Unix timestamp in milliseconds when the sample arrived.
    pub received_at_ms: u64,
}

/// Thread-safe store of the latest value for every stream.
///
/// Only the latest reading is kept; every `set` overwrites the previous one.
#[derive(Debug, Default)]
pub struct SensorValueStore {
    readings: RwLock<BTreeMap<String, BTreeMap<SensorType, Reading>>>,
}

impl SensorValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the current value of a stream. Non-finite values are stored as absent.
    pub fn set(&self, gear_id: &str, sensor: SensorType, value: Option<f64>) -> Reading {
        let reading = Reading {
            value: value.filter(|v| v.is_finite()),
            received_at_ms: current_timestamp_ms(),
        };

        let mut readings = self.readings.write();
        match readings.get_mut(gear_id) {
            Some(streams) => {
                streams.insert(sensor, reading);
            }
            None => {
                readings.insert(gear_id.to_string(), BTreeMap::from([(sensor, reading)]));
            }
        }
        reading
    }

    /// Latest value, or `None` if nothing usable has arrived.
    pub fn get(&self, gear_id: &str, sensor: SensorType) -> Option<f64> {
        self.reading(gear_id, sensor).and_then(|r| r.value)
    }

    pub fn reading(&self, gear_id: &str, sensor: SensorType) -> Option<Reading> {
        self.readings
            .read()
            .get(gear_id)
            .and_then(|streams| streams.get(&sensor))
            .copied()
    }

    /// Current value of every sensor for a gear; sensors without a value map to `None`.
    pub fn snapshot(&self, gear_id: &str) -> BTreeMap<SensorType, Option<f64>> {
        let readings = self.readings.read();
        let streams = readings.get(gear_id);
        SensorType::ALL
            .into_iter()
            .map(|sensor| {
                let value = streams
                    .and_then(|s| s.get(&sensor))
                    .and_then(|r| r.value);
                (sensor, value)
            })
            .collect()
    }

    /// Drop every stream of a gear. Returns `true` if anything was stored.
    pub fn forget(&self, gear_id: &str) -> bool {
        self.readings.write().remove(gear_id).is_some()
    }
}

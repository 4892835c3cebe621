//! Sample source abstraction for receiving sensor readings.
//!
//! The gear streams one JSON object per reading. Sources hide where those
//! lines come from (a replay file, a TCP connection, an in-process channel)
//! behind the [`SampleSource`] trait.

mod channel;
mod stream;

pub use channel::ChannelSource;
pub use stream::StreamSource;

use std::fmt::Debug;

use async_trait::async_trait;
use hardhat_types::SensorType;
use serde::{Deserialize, Serialize};

/// One sensor reading as sent by the gear.
///
/// ```json
/// {"gearId": "HH-01", "sensor": "heartRate", "value": 88.0}
/// ```
///
/// `value` may be `null` or missing when the sensor reports no reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub gear_id: String,
    pub sensor: SensorType,
    #[serde(default)]
    pub value: Option<f64>,
}

impl Sample {
    pub fn new(gear_id: impl Into<String>, sensor: SensorType, value: Option<f64>) -> Self {
        Self {
            gear_id: gear_id.into(),
            sensor,
            value,
        }
    }
}

/// Trait for receiving samples from various sources.
///
/// # Example
///
/// ```
/// use hardhat_watch::{ChannelSource, Sample, SampleSource};
/// use hardhat_types::SensorType;
///
/// # tokio_test::block_on(async {
/// let (tx, mut source) = ChannelSource::create("gateway", 16);
/// tx.send(Sample::new("HH-01", SensorType::HeartRate, Some(88.0))).await.unwrap();
/// drop(tx);
///
/// while let Some(sample) = source.recv().await {
///     println!("{} {} {:?}", sample.gear_id, sample.sensor, sample.value);
/// }
/// # });
/// ```
#[async_trait]
pub trait SampleSource: Send + Debug {
    /// Wait for the next sample. Returns `None` once the source is exhausted.
    async fn recv(&mut self) -> Option<Sample>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}

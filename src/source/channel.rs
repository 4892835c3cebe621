//! Channel-based sample source.
//!
//! Receives samples pushed by in-process producers, such as a gateway
//! bridging a radio link or a test harness.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Sample, SampleSource};

/// A sample source fed through a bounded channel.
///
/// # Example
///
/// ```
/// use hardhat_watch::ChannelSource;
///
/// let (tx, source) = ChannelSource::create("lora-gateway", 64);
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<Sample>,
    description: String,
}

impl ChannelSource {
    /// Wrap an existing receiver.
    ///
    /// `source_description` names where samples come from
    /// (e.g. "lora-gateway", "replay").
    pub fn new(receiver: mpsc::Receiver<Sample>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
        }
    }

    /// Create a channel pair. The source ends once every sender is dropped.
    pub fn create(source_description: &str, buffer: usize) -> (mpsc::Sender<Sample>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx, source_description))
    }
}

#[async_trait]
impl SampleSource for ChannelSource {
    async fn recv(&mut self) -> Option<Sample> {
        self.receiver.recv().await
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hardhat_types::SensorType;

    #[tokio::test]
    async fn delivers_in_order_then_ends() {
        let (tx, mut source) = ChannelSource::create("test", 4);
        tx.send(Sample::new("HH-01", SensorType::SmokeSensor, Some(1.0)))
            .await
            .unwrap();
        tx.send(Sample::new("HH-01", SensorType::SmokeSensor, Some(2.0)))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(source.recv().await.unwrap().value, Some(1.0));
        assert_eq!(source.recv().await.unwrap().value, Some(2.0));
        assert!(source.recv().await.is_none());
        assert_eq!(source.description(), "channel: test");
    }
}

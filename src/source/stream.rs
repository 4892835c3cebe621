//! Stream-based sample source.
//!
//! Reads newline-delimited JSON samples from an async byte stream. This
//! covers TCP connections from a gateway as well as replay files.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use super::{Sample, SampleSource};

/// Shared between the reader task and the source.
#[derive(Debug, Default)]
struct StreamStatus {
    last_error: Mutex<Option<String>>,
    skipped: AtomicU64,
}

impl StreamStatus {
    fn reject(&self, description: &str, error: String) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(source = description, %error, "skipping malformed sample");
        *self.last_error.lock() = Some(error);
    }
}

/// A sample source that reads from an async stream.
///
/// A background task reads one JSON [`Sample`] per line and forwards it.
/// Malformed lines are logged and skipped; they never end the stream.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use hardhat_watch::{SampleSource, StreamSource};
///
/// # tokio_test::block_on(async {
/// let data = b"{\"gearId\":\"HH-01\",\"sensor\":\"heartRate\",\"value\":88}\n";
/// let mut source = StreamSource::spawn(Cursor::new(data.to_vec()), "example");
/// let sample = source.recv().await.unwrap();
/// assert_eq!(sample.value, Some(88.0));
/// # });
/// ```
#[derive(Debug)]
pub struct StreamSource {
    receiver: mpsc::Receiver<Sample>,
    description: String,
    status: Arc<StreamStatus>,
}

impl StreamSource {
    /// Spawn a background task that reads from the given async reader.
    pub fn spawn<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(256);
        let status = Arc::new(StreamStatus::default());
        let task_status = status.clone();
        let desc = description.to_string();

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::debug!(source = %desc, "sample stream closed");
                        break;
                    }
                    Ok(_) => {
                        let text = line.trim();
                        if text.is_empty() {
                            continue;
                        }
                        match parse_sample(text) {
                            Ok(sample) => {
                                if tx.send(sample).await.is_err() {
                                    // Receiver dropped
                                    break;
                                }
                            }
                            Err(e) => task_status.reject(&desc, format!("Parse error: {}", e)),
                        }
                    }
                    Err(e) => {
                        tracing::error!(source = %desc, error = %e, "sample stream failed");
                        *task_status.last_error.lock() = Some(format!("Read error: {}", e));
                        break;
                    }
                }
            }
        });

        Self {
            receiver: rx,
            description: format!("stream: {}", description),
            status,
        }
    }

    /// Get the last error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.status.last_error.lock().clone()
    }

    /// Number of lines rejected so far.
    pub fn skipped(&self) -> u64 {
        self.status.skipped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SampleSource for StreamSource {
    async fn recv(&mut self) -> Option<Sample> {
        self.receiver.recv().await
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Parse one line of the sample stream.
pub fn parse_sample(line: &str) -> Result<Sample, serde_json::Error> {
    serde_json::from_str(line)
}

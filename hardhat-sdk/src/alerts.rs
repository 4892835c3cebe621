//! Outputs for user-visible alerts ("toasts").

use hardhat_types::current_timestamp_ms;
use serde::Serialize;
use tokio::sync::mpsc;

/// How an alert should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Success,
    Info,
}

/// A fire-and-forget alert for the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub severity: Severity,
    pub message: String,
    /// The gear the alert is about, if any.
    pub gear_id: Option<String>,
    pub timestamp_ms: u64,
}

impl Toast {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            gear_id: None,
            timestamp_ms: current_timestamp_ms(),
        }
    }

    pub fn for_gear(mut self, gear_id: impl Into<String>) -> Self {
        self.gear_id = Some(gear_id.into());
        self
    }
}

/// Destination for alerts.
///
/// Multiple outputs can be configured; every alert goes to all of them.
/// Delivery never blocks and never fails the caller.
#[derive(Debug, Clone)]
pub enum AlertOutput {
    /// Emit alerts as log events at a level matching their severity.
    Log,

    /// Send alerts through a bounded channel.
    ///
    /// Use `AlertOutput::channel()` to create this variant and get the receiver.
    Channel(mpsc::Sender<Toast>),
}

impl AlertOutput {
    pub fn log() -> Self {
        AlertOutput::Log
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hardhat_sdk::AlertOutput;
    ///
    /// let (output, mut rx) = AlertOutput::channel(64);
    ///
    /// // Later, drain alerts
    /// // while let Some(toast) = rx.recv().await {
    /// //     println!("{:?}: {}", toast.severity, toast.message);
    /// // }
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Toast>) {
        let (tx, rx) = mpsc::channel(buffer);
        (AlertOutput::Channel(tx), rx)
    }

    pub(crate) fn emit(&self, toast: &Toast) {
        match self {
            AlertOutput::Log => match toast.severity {
                Severity::Error => {
                    tracing::error!(gear_id = ?toast.gear_id, "{}", toast.message)
                }
                Severity::Success | Severity::Info => {
                    tracing::info!(gear_id = ?toast.gear_id, "{}", toast.message)
                }
            },
            AlertOutput::Channel(tx) => {
                // Best effort: a full or closed channel drops the alert
                if tx.try_send(toast.clone()).is_err() {
                    tracing::debug!(message = %toast.message, "alert channel full or closed");
                }
            }
        }
    }
}

/// Fan-out over all configured outputs.
#[derive(Debug, Clone, Default)]
pub struct Alerts {
    outputs: Vec<AlertOutput>,
}

impl Alerts {
    pub fn new(outputs: Vec<AlertOutput>) -> Self {
        Self { outputs }
    }

    pub fn show(&self, toast: Toast) {
        for output in &self.outputs {
            output.emit(&toast);
        }
    }
}

//! Per-person periodic recording sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::MonitorError;
use crate::recorder::Recorder;

/// Handle for one running session. Dropping it also stops the session.
#[derive(Debug)]
struct RecordingHandle {
    stop_tx: watch::Sender<bool>,
}

impl RecordingHandle {
    fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Runs one repeating save timer per recording gear id.
///
/// A session saves immediately on start and then once per interval. Stopping
/// a session lets a save already in flight finish but starts no new one.
#[derive(Debug)]
pub struct RecordingScheduler {
    recorder: Arc<Recorder>,
    interval: Duration,
    sessions: Mutex<HashMap<String, RecordingHandle>>,
}

impl RecordingScheduler {
    pub fn new(recorder: Arc<Recorder>, interval: Duration) -> Self {
        Self {
            recorder,
            interval,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start recording a gear id.
    ///
    /// Returns `Ok(false)` if a session is already running; the existing timer
    /// is left alone so a gear never has two.
    pub fn start(&self, gear_id: &str) -> Result<bool, MonitorError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| MonitorError::NoRuntime("recording session"))?;

        let mut sessions = self.sessions.lock();
        if sessions.contains_key(gear_id) {
            return Ok(false);
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let recorder = Arc::clone(&self.recorder);
        let interval = self.interval;
        let gear = gear_id.to_string();

        runtime.spawn(async move {
            // First tick completes immediately
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = timer.tick() => {
                        recorder.tick(&gear).await;
                    }
                }
            }
            tracing::debug!(gear_id = %gear, "recording session ended");
        });

        sessions.insert(gear_id.to_string(), RecordingHandle { stop_tx });
        tracing::info!(gear_id, interval_ms = interval.as_millis() as u64, "recording started");
        Ok(true)
    }

    /// Stop recording a gear id. Returns `false` if it was not recording.
    pub fn stop(&self, gear_id: &str) -> bool {
        match self.sessions.lock().remove(gear_id) {
            Some(handle) => {
                handle.stop();
                tracing::info!(gear_id, "recording stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, gear_id: &str) -> bool {
        self.sessions.lock().contains_key(gear_id)
    }

    /// Gear ids with a running session, sorted.
    pub fn running(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop every session.
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.sessions.lock().drain().collect();
        for (_, handle) in drained {
            handle.stop();
        }
    }
}

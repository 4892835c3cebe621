//! Per-stream timeout detection.
//!
//! Every live (gear, sensor) stream owns one pending check, scheduled one
//! window after its latest reading. A new reading clears the timed-out flag,
//! cancels the pending check and schedules a fresh one, so checks are
//! debounced rather than accumulated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hardhat_types::SensorType;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type StreamKey = (String, SensorType);

#[derive(Debug)]
struct StreamState {
    last_updated: Instant,
    timed_out: bool,
    /// Bumped on every reading; a check only fires for the generation it was armed for.
    generation: u64,
    check: Option<JoinHandle<()>>,
}

/// Timeout watchers for every live stream.
#[derive(Debug)]
pub struct StalenessWatchers {
    window: Duration,
    streams: Arc<Mutex<HashMap<StreamKey, StreamState>>>,
}

impl StalenessWatchers {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            streams: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a reading: clear the timeout and re-arm the check.
    ///
    /// Outside a Tokio runtime the reading is still recorded, but no check is
    /// armed and the stream can never time out.
    pub fn touch(&self, gear_id: &str, sensor: SensorType) {
        let now = Instant::now();
        let key = (gear_id.to_string(), sensor);

        let mut streams = self.streams.lock();
        let state = streams.entry(key.clone()).or_insert_with(|| StreamState {
            last_updated: now,
            timed_out: false,
            generation: 0,
            check: None,
        });

        state.timed_out = false;
        state.last_updated = now;
        state.generation += 1;
        if let Some(check) = state.check.take() {
            check.abort();
        }

        state.check = match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(check_after(
                Arc::clone(&self.streams),
                key,
                state.generation,
                now + self.window,
                self.window,
            ))),
            Err(_) => {
                tracing::warn!(
                    gear_id,
                    sensor = %sensor,
                    "no runtime available, staleness check not scheduled"
                );
                None
            }
        };
    }

    pub fn is_timed_out(&self, gear_id: &str, sensor: SensorType) -> bool {
        self.streams
            .lock()
            .get(&(gear_id.to_string(), sensor))
            .map(|s| s.timed_out)
            .unwrap_or(false)
    }

    pub fn last_updated(&self, gear_id: &str, sensor: SensorType) -> Option<Instant> {
        self.streams
            .lock()
            .get(&(gear_id.to_string(), sensor))
            .map(|s| s.last_updated)
    }

    /// Number of streams that have received at least one reading.
    pub fn live_streams(&self) -> usize {
        self.streams.lock().len()
    }

    /// Cancel and drop every watcher of a gear.
    pub fn forget(&self, gear_id: &str) {
        self.streams.lock().retain(|(gear, _), state| {
            if gear != gear_id {
                return true;
            }
            if let Some(check) = state.check.take() {
                check.abort();
            }
            false
        });
    }

    /// Cancel every pending check.
    pub fn shutdown(&self) {
        for state in self.streams.lock().values_mut() {
            if let Some(check) = state.check.take() {
                check.abort();
            }
        }
    }
}

async fn check_after(
    streams: Arc<Mutex<HashMap<StreamKey, StreamState>>>,
    key: StreamKey,
    generation: u64,
    deadline: Instant,
    window: Duration,
) {
    tokio::time::sleep_until(deadline).await;

    let mut streams = streams.lock();
    let Some(state) = streams.get_mut(&key) else {
        return;
    };
    if state.generation != generation || state.last_updated.elapsed() < window {
        return;
    }

    state.timed_out = true;
    state.check = None;
    tracing::warn!(
        gear_id = %key.0,
        sensor = %key.1,
        window_ms = window.as_millis() as u64,
        "sensor stream timed out"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(30);

    #[tokio::test(start_paused = true)]
    async fn times_out_after_window() {
        let watchers = StalenessWatchers::new(WINDOW);
        watchers.touch("HH-01", SensorType::HeartRate);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(!watchers.is_timed_out("HH-01", SensorType::HeartRate));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(watchers.is_timed_out("HH-01", SensorType::HeartRate));
    }

    #[tokio::test(start_paused = true)]
    async fn new_reading_clears_and_reschedules() {
        let watchers = StalenessWatchers::new(WINDOW);
        watchers.touch("HH-01", SensorType::SmokeSensor);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(watchers.is_timed_out("HH-01", SensorType::SmokeSensor));

        watchers.touch("HH-01", SensorType::SmokeSensor);
        assert!(!watchers.is_timed_out("HH-01", SensorType::SmokeSensor));

        // The fresh check is a full window after the new reading
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(!watchers.is_timed_out("HH-01", SensorType::SmokeSensor));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(watchers.is_timed_out("HH-01", SensorType::SmokeSensor));
    }

    #[tokio::test(start_paused = true)]
    async fn steady_readings_never_time_out() {
        let watchers = StalenessWatchers::new(WINDOW);
        for _ in 0..10 {
            watchers.touch("HH-01", SensorType::BodyTemperature);
            tokio::time::sleep(Duration::from_secs(20)).await;
            assert!(!watchers.is_timed_out("HH-01", SensorType::BodyTemperature));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn streams_are_independent() {
        let watchers = StalenessWatchers::new(WINDOW);
        watchers.touch("HH-01", SensorType::HeartRate);
        watchers.touch("HH-01", SensorType::ToxicGasSensor);

        tokio::time::sleep(Duration::from_secs(20)).await;
        watchers.touch("HH-01", SensorType::ToxicGasSensor);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(watchers.is_timed_out("HH-01", SensorType::HeartRate));
        assert!(!watchers.is_timed_out("HH-01", SensorType::ToxicGasSensor));
        assert_eq!(watchers.live_streams(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn forget_cancels_gear_watchers() {
        let watchers = StalenessWatchers::new(WINDOW);
        watchers.touch("HH-01", SensorType::HeartRate);
        watchers.touch("HH-02", SensorType::HeartRate);

        watchers.forget("HH-01");
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(!watchers.is_timed_out("HH-01", SensorType::HeartRate));
        assert!(watchers.last_updated("HH-01", SensorType::HeartRate).is_none());
        assert!(watchers.is_timed_out("HH-02", SensorType::HeartRate));
    }

    #[test]
    fn touch_without_runtime_only_records() {
        let watchers = StalenessWatchers::new(WINDOW);
        watchers.touch("HH-01", SensorType::HeartRate);

        assert!(watchers.last_updated("HH-01", SensorType::HeartRate).is_some());
        assert!(!watchers.is_timed_out("HH-01", SensorType::HeartRate));
    }
}

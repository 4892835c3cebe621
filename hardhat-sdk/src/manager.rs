//! The top-level monitoring orchestrator.

use std::sync::Arc;

use hardhat_types::{current_timestamp_ms, Condition, Notification, Person, SensorType};
use uuid::Uuid;

use crate::alerts::{AlertOutput, Severity, Toast};
use crate::config::MonitorConfig;
use crate::context::MonitorContext;
use crate::error::MonitorError;
use crate::evaluator::evaluate;
use crate::recorder::{Recorder, SaveOutcome};
use crate::scheduler::RecordingScheduler;
use crate::storage::{LocalStore, MemoryLocalStore, MemoryRecordStore, RecordStore};

/// Current state of one sensor stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorStatus {
    pub sensor: SensorType,
    pub value: Option<f64>,
    /// Last condition announced for this stream.
    pub condition: Condition,
    pub timed_out: bool,
}

/// Everything a UI needs to draw one monitored person.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonStatus {
    pub person: Person,
    pub recording: bool,
    /// One entry per sensor, in [`SensorType::ALL`] order.
    pub sensors: Vec<SensorStatus>,
}

/// Monitors a set of personnel: evaluates incoming samples, raises alerts
/// on condition changes and runs per-person recording sessions.
///
/// # Example
///
/// ```rust,no_run
/// use hardhat_sdk::{MonitoringSessionManager, AlertOutput};
/// use hardhat_types::{Person, SensorType};
///
/// # async fn demo() -> Result<(), hardhat_sdk::MonitorError> {
/// let (alerts, mut rx) = AlertOutput::channel(64);
/// let manager = MonitoringSessionManager::builder()
///     .alert_output(alerts)
///     .build()?;
///
/// manager.add_person(Person::new("HH-01", "Ana Reyes", "Nozzle"));
/// manager.ingest("HH-01", SensorType::SmokeSensor, Some(420.0));
/// manager.start_recording("HH-01")?;
///
/// while let Some(toast) = rx.recv().await {
///     println!("{}", toast.message);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MonitoringSessionManager {
    ctx: Arc<MonitorContext>,
    recorder: Arc<Recorder>,
    scheduler: RecordingScheduler,
}

impl MonitoringSessionManager {
    pub fn builder() -> MonitoringSessionManagerBuilder {
        MonitoringSessionManagerBuilder::default()
    }

    /// Shared state, for read access from embedding code.
    pub fn context(&self) -> &MonitorContext {
        &self.ctx
    }

    /// Add a person to the monitored set. Returns `false` if the gear id is
    /// already monitored.
    pub fn add_person(&self, person: Person) -> bool {
        let toast = Toast::new(
            Severity::Success,
            format!("{} added to monitoring", person.name),
        )
        .for_gear(person.gear_id.as_str());

        if !self.ctx.roster.add(person) {
            return false;
        }
        self.ctx.alerts.show(toast);
        true
    }

    /// Remove a person, stopping their recording and staleness watchers.
    ///
    /// Condition flags are kept, so re-adding the person does not re-announce
    /// a condition that was already reported.
    pub fn remove_person(&self, gear_id: &str) -> Option<Person> {
        let person = self.ctx.roster.remove(gear_id)?;
        self.scheduler.stop(gear_id);
        self.ctx.staleness.forget(gear_id);
        self.ctx.values.forget(gear_id);

        self.ctx.alerts.show(
            Toast::new(
                Severity::Info,
                format!("{} removed from monitoring", person.name),
            )
            .for_gear(gear_id),
        );
        Some(person)
    }

    /// Feed one sample into the engine.
    ///
    /// For monitored gear the value is always stored and the stream's
    /// staleness watcher reset. If the value changes the stream's condition, a
    /// notification is logged, the flag updated and an alert raised; the new
    /// notification is returned. Samples for gear ids outside the monitored
    /// set are dropped.
    pub fn ingest(
        &self,
        gear_id: &str,
        sensor: SensorType,
        value: Option<f64>,
    ) -> Option<Notification> {
        if !self.ctx.roster.contains(gear_id) {
            tracing::debug!(gear_id, sensor = sensor.key(), "sample for unmonitored gear dropped");
            return None;
        }

        let reading = self.ctx.values.set(gear_id, sensor, value);
        self.ctx.staleness.touch(gear_id, sensor);
        tracing::debug!(gear_id, sensor = sensor.key(), value = ?reading.value, "ingest");

        let value = reading.value?;
        let threshold = self.ctx.config.thresholds.get(sensor);
        let transition = self
            .ctx
            .flags
            .update(gear_id, sensor, |previous| evaluate(Some(value), threshold, previous))?;

        let message = Notification::message_for(sensor, transition.to)?;
        let timestamp_ms = current_timestamp_ms();
        let notification = Notification {
            id: notification_id(gear_id, sensor, timestamp_ms),
            message,
            timestamp_ms,
            gear_id: gear_id.to_string(),
            sensor,
            value,
            is_critical: transition.to == Condition::Critical,
            saved: false,
        };
        self.ctx.log.append(notification.clone());

        tracing::info!(
            gear_id,
            sensor = sensor.key(),
            value,
            from = ?transition.from,
            to = ?transition.to,
            "condition changed"
        );

        let who = self
            .ctx
            .roster
            .get(gear_id)
            .map(|p| p.display_name())
            .unwrap_or_else(|| gear_id.to_string());
        let severity = if notification.is_critical {
            Severity::Error
        } else {
            Severity::Success
        };
        self.ctx.alerts.show(
            Toast::new(
                severity,
                format!(
                    "{}: {} ({} {})",
                    who,
                    notification.message,
                    value,
                    sensor.unit()
                ),
            )
            .for_gear(gear_id),
        );

        Some(notification)
    }

    /// Start or stop recording. Returns whether recording is now active.
    pub fn toggle_recording(&self, gear_id: &str) -> Result<bool, MonitorError> {
        if self.scheduler.is_running(gear_id) {
            self.stop_recording(gear_id);
            Ok(false)
        } else {
            self.start_recording(gear_id)?;
            Ok(true)
        }
    }

    /// Start recording a monitored person. Returns `Ok(false)` if already recording.
    pub fn start_recording(&self, gear_id: &str) -> Result<bool, MonitorError> {
        let person = self
            .ctx
            .roster
            .get(gear_id)
            .ok_or_else(|| MonitorError::PersonnelNotFound(gear_id.to_string()))?;

        let started = self.scheduler.start(gear_id)?;
        if started {
            self.ctx.alerts.show(
                Toast::new(
                    Severity::Info,
                    format!("Recording started for {}", person.display_name()),
                )
                .for_gear(gear_id),
            );
        }
        Ok(started)
    }

    /// Stop recording. Returns `false` if the gear was not recording.
    pub fn stop_recording(&self, gear_id: &str) -> bool {
        let stopped = self.scheduler.stop(gear_id);
        if stopped {
            let who = self
                .ctx
                .roster
                .get(gear_id)
                .map(|p| p.display_name())
                .unwrap_or_else(|| gear_id.to_string());
            self.ctx.alerts.show(
                Toast::new(Severity::Info, format!("Recording stopped for {}", who))
                    .for_gear(gear_id),
            );
        }
        stopped
    }

    pub fn is_recording(&self, gear_id: &str) -> bool {
        self.scheduler.is_running(gear_id)
    }

    /// Run one save outside the timer.
    pub async fn save_now(&self, gear_id: &str) -> Result<SaveOutcome, MonitorError> {
        self.recorder.save(gear_id).await
    }

    pub fn status(&self, gear_id: &str) -> Option<PersonStatus> {
        let person = self.ctx.roster.get(gear_id)?;
        let values = self.ctx.values.snapshot(gear_id);
        let sensors = SensorType::ALL
            .iter()
            .map(|&sensor| SensorStatus {
                sensor,
                value: values.get(&sensor).copied().flatten(),
                condition: self.ctx.flags.get(gear_id, sensor),
                timed_out: self.ctx.staleness.is_timed_out(gear_id, sensor),
            })
            .collect();

        Some(PersonStatus {
            person,
            recording: self.scheduler.is_running(gear_id),
            sensors,
        })
    }

    /// Monitored personnel in the order they were added.
    pub fn monitored(&self) -> Vec<Person> {
        self.ctx.roster.list()
    }

    /// Every notification, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.ctx.log.entries()
    }

    pub fn notifications_for(&self, gear_id: &str) -> Vec<Notification> {
        self.ctx.log.for_gear(gear_id)
    }

    pub fn is_timed_out(&self, gear_id: &str, sensor: SensorType) -> bool {
        self.ctx.staleness.is_timed_out(gear_id, sensor)
    }

    /// Stop all recording sessions and staleness watchers.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        self.ctx.staleness.shutdown();
        tracing::info!("monitoring shut down");
    }
}

/// Identity, time and a random component, so ids never collide even within
/// one millisecond.
fn notification_id(gear_id: &str, sensor: SensorType, timestamp_ms: u64) -> String {
    format!(
        "{}-{}-{}-{}",
        gear_id,
        sensor.key(),
        timestamp_ms,
        Uuid::new_v4().simple()
    )
}

/// Builder for [`MonitoringSessionManager`].
///
/// Collaborators default to in-memory stores and a single log alert output.
#[derive(Debug, Default)]
pub struct MonitoringSessionManagerBuilder {
    config: Option<MonitorConfig>,
    records: Option<Arc<dyn RecordStore>>,
    local: Option<Arc<dyn LocalStore>>,
    outputs: Vec<AlertOutput>,
}

impl MonitoringSessionManagerBuilder {
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.records = Some(store);
        self
    }

    pub fn local_store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.local = Some(store);
        self
    }

    /// Add an alert output. Can be called multiple times.
    pub fn alert_output(mut self, output: AlertOutput) -> Self {
        self.outputs.push(output);
        self
    }

    /// Validate the configuration, restore persisted state and build the manager.
    pub fn build(self) -> Result<MonitoringSessionManager, MonitorError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let outputs = if self.outputs.is_empty() {
            vec![AlertOutput::log()]
        } else {
            self.outputs
        };
        let records = self
            .records
            .unwrap_or_else(|| Arc::new(MemoryRecordStore::new()));
        let local = self
            .local
            .unwrap_or_else(|| Arc::new(MemoryLocalStore::new()));

        let interval = config.recording_interval;
        let ctx = Arc::new(MonitorContext::new(config, records, local, outputs));
        let recorder = Arc::new(Recorder::new(Arc::clone(&ctx)));
        let scheduler = RecordingScheduler::new(Arc::clone(&recorder), interval);

        Ok(MonitoringSessionManager {
            ctx,
            recorder,
            scheduler,
        })
    }
}

//! The save action run on every recording tick.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;
use hardhat_types::{Notification, Person, RealtimeRecord};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::alerts::{Severity, Toast};
use crate::context::MonitorContext;
use crate::error::MonitorError;
use crate::roster::RecordClaim;
use crate::storage::{Document, NOTIFICATIONS_COLLECTION, REALTIME_COLLECTION};

/// What one save accomplished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub record_id: String,
    /// The durable record was created during this save.
    pub created_record: bool,
    /// Notification rows written (rows already present are skipped).
    pub notifications_written: usize,
    /// Log entries flipped to saved.
    pub notifications_marked: usize,
}

/// Result of a save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(SaveReport),
    /// Another save for the same gear was in flight.
    Skipped,
}

/// Persists snapshots and pending notifications for monitored personnel.
#[derive(Debug)]
pub struct Recorder {
    ctx: Arc<MonitorContext>,
    in_flight: Mutex<HashSet<String>>,
}

impl Recorder {
    pub fn new(ctx: Arc<MonitorContext>) -> Self {
        Self {
            ctx,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Save one gear's pending notifications and current values.
    ///
    /// Overlapping calls for the same gear short-circuit with
    /// [`SaveOutcome::Skipped`]; the guard is taken before the first await.
    pub async fn save(&self, gear_id: &str) -> Result<SaveOutcome, MonitorError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, gear_id) else {
            tracing::debug!(gear_id, "save already in flight, skipping");
            return Ok(SaveOutcome::Skipped);
        };

        let person = self
            .ctx
            .roster
            .get(gear_id)
            .ok_or_else(|| MonitorError::PersonnelNotFound(gear_id.to_string()))?;

        let (record_id, created_record) = match self.ensure_record(&person).await? {
            Some(resolved) => resolved,
            None => return Ok(SaveOutcome::Skipped),
        };

        let (notifications_written, notifications_marked) =
            self.flush_notifications(gear_id, &record_id).await?;

        self.append_snapshot(gear_id, &record_id).await?;

        Ok(SaveOutcome::Saved(SaveReport {
            record_id,
            created_record,
            notifications_written,
            notifications_marked,
        }))
    }

    /// Save and report failures instead of returning them.
    pub async fn tick(&self, gear_id: &str) {
        match self.save(gear_id).await {
            Ok(SaveOutcome::Saved(report)) => tracing::debug!(
                gear_id,
                record_id = %report.record_id,
                written = report.notifications_written,
                "recording saved"
            ),
            Ok(SaveOutcome::Skipped) => {}
            Err(e) => {
                tracing::error!(gear_id, error = %e, "recording save failed");
                let message = match &e {
                    MonitorError::PersonnelNotFound(_) => "Personnel not found".to_string(),
                    other => format!("Failed to save recording: {}", other),
                };
                self.ctx
                    .alerts
                    .show(Toast::new(Severity::Error, message).for_gear(gear_id));
            }
        }
    }

    /// Resolve the person's record, creating it at most once.
    ///
    /// The identity fields are written right after creation and retried on
    /// later saves until they land. Returns `None` when another caller is
    /// mid-creation.
    async fn ensure_record(
        &self,
        person: &Person,
    ) -> Result<Option<(String, bool)>, MonitorError> {
        let gear_id = person.gear_id.as_str();
        let claim = self
            .ctx
            .roster
            .claim_record(gear_id)
            .ok_or_else(|| MonitorError::PersonnelNotFound(gear_id.to_string()))?;

        match claim {
            RecordClaim::Existing(id) => Ok(Some((id, false))),
            RecordClaim::Busy => Ok(None),
            RecordClaim::MissingBaseline(id) => {
                self.write_baseline(person, &id).await?;
                Ok(Some((id, false)))
            }
            RecordClaim::Claimed => {
                let record_id = match self.ctx.records.create_record().await {
                    Ok(id) => id,
                    Err(e) => {
                        self.ctx.roster.abandon_record(gear_id);
                        return Err(e.into());
                    }
                };
                if !self.ctx.roster.finish_record(gear_id, &record_id) {
                    tracing::warn!(
                        gear_id,
                        record_id = %record_id,
                        "person removed while their record was being created, record orphaned"
                    );
                    return Err(MonitorError::PersonnelNotFound(gear_id.to_string()));
                }
                tracing::info!(gear_id, record_id = %record_id, "created durable record");

                self.write_baseline(person, &record_id).await?;
                Ok(Some((record_id, true)))
            }
        }
    }

    async fn write_baseline(&self, person: &Person, record_id: &str) -> Result<(), MonitorError> {
        let now = Local::now();
        let mut baseline = Document::new();
        baseline.insert("gearId".into(), Value::from(person.gear_id.as_str()));
        baseline.insert("name".into(), Value::from(person.name.as_str()));
        baseline.insert("position".into(), Value::from(person.position.as_str()));
        baseline.insert(
            "dateCreated".into(),
            Value::from(now.format("%Y-%m-%d").to_string()),
        );
        baseline.insert(
            "timeCreated".into(),
            Value::from(now.format("%H:%M:%S").to_string()),
        );
        self.ctx.records.upsert_fields(record_id, baseline).await?;
        self.ctx.roster.baseline_written(&person.gear_id, record_id);
        Ok(())
    }

    async fn flush_notifications(
        &self,
        gear_id: &str,
        record_id: &str,
    ) -> Result<(usize, usize), MonitorError> {
        let pending = self.ctx.log.unsaved_for(gear_id);
        if pending.is_empty() {
            return Ok((0, 0));
        }

        let mut written = 0;
        for notification in &pending {
            let id = Value::from(notification.id.as_str());
            let exists = self
                .ctx
                .records
                .exists(record_id, NOTIFICATIONS_COLLECTION, "id", &id)
                .await?;
            if exists {
                continue;
            }
            let row = Notification {
                saved: true,
                ..notification.clone()
            };
            self.ctx
                .records
                .append_subrecord(record_id, NOTIFICATIONS_COLLECTION, to_document(&row)?)
                .await?;
            written += 1;
        }

        let ids: HashSet<String> = pending.into_iter().map(|n| n.id).collect();
        let marked = self.ctx.log.mark_saved(&ids);
        Ok((written, marked))
    }

    async fn append_snapshot(&self, gear_id: &str, record_id: &str) -> Result<(), MonitorError> {
        let now = Local::now();
        let mut builder = RealtimeRecord::builder()
            .timestamp_ms(now.timestamp_millis().max(0) as u64)
            .date(now.format("%Y-%m-%d").to_string())
            .time(now.format("%H:%M:%S").to_string());
        for (sensor, value) in self.ctx.values.snapshot(gear_id) {
            builder = builder.maybe_value(sensor, value);
        }

        self.ctx
            .records
            .append_subrecord(record_id, REALTIME_COLLECTION, to_document(&builder.build())?)
            .await?;
        Ok(())
    }
}

fn to_document<T: Serialize>(value: &T) -> Result<Document, MonitorError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut doc = Document::new();
            doc.insert("value".into(), other);
            Ok(doc)
        }
    }
}

/// Marks a gear as having a save in flight until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    gear_id: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, gear_id: &str) -> Option<Self> {
        if !set.lock().insert(gear_id.to_string()) {
            return None;
        }
        Some(Self {
            set,
            gear_id: gear_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.gear_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use hardhat_types::SensorType;

    use crate::alerts::AlertOutput;
    use crate::config::MonitorConfig;
    use crate::error::StoreError;
    use crate::storage::{MemoryLocalStore, MemoryRecordStore, RecordStore};

    /// Memory store with slow creates and switchable failures.
    #[derive(Debug, Default)]
    struct TestStore {
        inner: MemoryRecordStore,
        create_delay: Duration,
        creates: AtomicUsize,
        fail_appends: AtomicBool,
        fail_upserts: AtomicBool,
    }

    #[async_trait]
    impl RecordStore for TestStore {
        async fn create_record(&self) -> Result<String, StoreError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if !self.create_delay.is_zero() {
                tokio::time::sleep(self.create_delay).await;
            }
            self.inner.create_record().await
        }

        async fn upsert_fields(&self, id: &str, fields: Document) -> Result<(), StoreError> {
            if self.fail_upserts.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("offline".into()));
            }
            self.inner.upsert_fields(id, fields).await
        }

        async fn append_subrecord(
            &self,
            id: &str,
            collection: &str,
            fields: Document,
        ) -> Result<(), StoreError> {
            if self.fail_appends.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("offline".into()));
            }
            self.inner.append_subrecord(id, collection, fields).await
        }

        async fn exists(
            &self,
            id: &str,
            collection: &str,
            field: &str,
            value: &Value,
        ) -> Result<bool, StoreError> {
            self.inner.exists(id, collection, field, value).await
        }
    }

    fn setup(store: Arc<TestStore>) -> (Arc<MonitorContext>, Recorder) {
        let ctx = Arc::new(MonitorContext::new(
            MonitorConfig::default(),
            store,
            Arc::new(MemoryLocalStore::new()),
            vec![AlertOutput::log()],
        ));
        ctx.roster.add(Person::new("HH-01", "Ana Reyes", "Nozzle"));
        let recorder = Recorder::new(Arc::clone(&ctx));
        (ctx, recorder)
    }

    fn notification(id: &str) -> Notification {
        Notification {
            id: id.to_string(),
            message: "High Smoke Detected!".to_string(),
            timestamp_ms: 1,
            gear_id: "HH-01".to_string(),
            sensor: SensorType::SmokeSensor,
            value: 400.0,
            is_critical: true,
            saved: false,
        }
    }

    fn saved(outcome: SaveOutcome) -> SaveReport {
        match outcome {
            SaveOutcome::Saved(report) => report,
            SaveOutcome::Skipped => panic!("save was skipped"),
        }
    }

    #[tokio::test]
    async fn first_save_creates_record_with_baseline() {
        let store = Arc::new(TestStore::default());
        let (ctx, recorder) = setup(Arc::clone(&store));

        let report = saved(recorder.save("HH-01").await.unwrap());
        assert!(report.created_record);

        let record = store.inner.record(&report.record_id).unwrap();
        assert_eq!(record.fields["gearId"], "HH-01");
        assert_eq!(record.fields["name"], "Ana Reyes");
        assert!(record.fields.contains_key("dateCreated"));
        assert!(record.fields.contains_key("timeCreated"));
        assert_eq!(
            ctx.roster.get("HH-01").unwrap().record_id.as_deref(),
            Some(report.record_id.as_str())
        );

        let second = saved(recorder.save("HH-01").await.unwrap());
        assert!(!second.created_record);
        assert_eq!(second.record_id, report.record_id);
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_baseline_is_retried_on_next_save() {
        let store = Arc::new(TestStore::default());
        let (ctx, recorder) = setup(Arc::clone(&store));

        store.fail_upserts.store(true, Ordering::SeqCst);
        assert!(recorder.save("HH-01").await.is_err());
        let record_id = ctx.roster.get("HH-01").unwrap().record_id.unwrap();
        assert!(store.inner.record(&record_id).unwrap().fields.is_empty());

        store.fail_upserts.store(false, Ordering::SeqCst);
        let report = saved(recorder.save("HH-01").await.unwrap());
        assert_eq!(report.record_id, record_id);
        assert!(!report.created_record);
        assert_eq!(store.inner.record_count(), 1);

        let fields = store.inner.record(&record_id).unwrap().fields;
        assert_eq!(fields["gearId"], "HH-01");
        assert_eq!(fields["position"], "Nozzle");
        assert!(fields.contains_key("dateCreated"));
        assert!(fields.contains_key("timeCreated"));
    }

    #[tokio::test(start_paused = true)]
    async fn removal_during_create_does_not_adopt_the_record() {
        let store = Arc::new(TestStore {
            create_delay: Duration::from_millis(500),
            ..TestStore::default()
        });
        let (ctx, recorder) = setup(Arc::clone(&store));

        let remove = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            ctx.roster.remove("HH-01");
        };
        let (result, ()) = tokio::join!(recorder.save("HH-01"), remove);
        assert!(matches!(result, Err(MonitorError::PersonnelNotFound(_))));

        // Re-adding claims a fresh record instead of reusing the orphan
        ctx.roster.add(Person::new("HH-01", "Ana Reyes", "Nozzle"));
        assert_eq!(ctx.roster.claim_record("HH-01"), Some(RecordClaim::Claimed));
    }

    #[tokio::test]
    async fn snapshot_includes_every_sensor() {
        let store = Arc::new(TestStore::default());
        let (ctx, recorder) = setup(Arc::clone(&store));
        ctx.values.set("HH-01", SensorType::HeartRate, Some(88.0));

        let report = saved(recorder.save("HH-01").await.unwrap());
        let rows = store.inner.collection(&report.record_id, REALTIME_COLLECTION);
        assert_eq!(rows.len(), 1);

        let values = rows[0]["values"].as_object().unwrap();
        assert_eq!(values.len(), SensorType::ALL.len());
        assert_eq!(values["heartRate"], 88.0);
        assert!(values["smokeSensor"].is_null());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_saves_create_one_record() {
        let store = Arc::new(TestStore {
            create_delay: Duration::from_millis(500),
            ..TestStore::default()
        });
        let (ctx, recorder) = setup(Arc::clone(&store));
        ctx.log.append(notification("n-1"));

        let (a, b) = tokio::join!(recorder.save("HH-01"), recorder.save("HH-01"));
        let outcomes = [a.unwrap(), b.unwrap()];

        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(store.inner.record_count(), 1);
        assert_eq!(
            outcomes.iter().filter(|o| **o == SaveOutcome::Skipped).count(),
            1
        );

        let record_id = ctx.roster.get("HH-01").unwrap().record_id.unwrap();
        assert_eq!(
            store.inner.collection(&record_id, NOTIFICATIONS_COLLECTION).len(),
            1
        );
    }

    #[tokio::test]
    async fn notifications_are_written_once() {
        let store = Arc::new(TestStore::default());
        let (ctx, recorder) = setup(Arc::clone(&store));
        ctx.log.append(notification("n-1"));
        ctx.log.append(notification("n-2"));

        let first = saved(recorder.save("HH-01").await.unwrap());
        assert_eq!(first.notifications_written, 2);
        assert_eq!(first.notifications_marked, 2);
        assert!(ctx.log.unsaved_for("HH-01").is_empty());

        let second = saved(recorder.save("HH-01").await.unwrap());
        assert_eq!(second.notifications_written, 0);

        let rows = store.inner.collection(&first.record_id, NOTIFICATIONS_COLLECTION);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["saved"], true);
    }

    #[tokio::test]
    async fn rows_already_in_storage_are_not_duplicated() {
        let store = Arc::new(TestStore::default());
        let (ctx, recorder) = setup(Arc::clone(&store));
        let first = saved(recorder.save("HH-01").await.unwrap());

        // Row reached storage but the log never got marked (e.g. crash before mark)
        let row = to_document(&notification("n-1")).unwrap();
        store
            .inner
            .append_subrecord(&first.record_id, NOTIFICATIONS_COLLECTION, row)
            .await
            .unwrap();
        ctx.log.append(notification("n-1"));

        let report = saved(recorder.save("HH-01").await.unwrap());
        assert_eq!(report.notifications_written, 0);
        assert_eq!(report.notifications_marked, 1);
        assert_eq!(
            store.inner.collection(&first.record_id, NOTIFICATIONS_COLLECTION).len(),
            1
        );
    }

    #[tokio::test]
    async fn failed_write_leaves_notifications_unsaved() {
        let store = Arc::new(TestStore::default());
        let (ctx, recorder) = setup(Arc::clone(&store));
        saved(recorder.save("HH-01").await.unwrap());
        ctx.log.append(notification("n-1"));

        store.fail_appends.store(true, Ordering::SeqCst);
        let err = recorder.save("HH-01").await.unwrap_err();
        assert!(matches!(err, MonitorError::Store(StoreError::Unavailable(_))));
        assert_eq!(ctx.log.unsaved_for("HH-01").len(), 1);

        // Next tick retries naturally
        store.fail_appends.store(false, Ordering::SeqCst);
        let report = saved(recorder.save("HH-01").await.unwrap());
        assert_eq!(report.notifications_written, 1);
        assert!(ctx.log.unsaved_for("HH-01").is_empty());
    }

    #[tokio::test]
    async fn unknown_person_is_an_error() {
        let store = Arc::new(TestStore::default());
        let (_ctx, recorder) = setup(store);

        let err = recorder.save("HH-99").await.unwrap_err();
        assert!(matches!(err, MonitorError::PersonnelNotFound(_)));
        assert_eq!(err.to_string(), "Personnel not found: HH-99");

        // The in-flight guard was released
        assert!(recorder.in_flight.lock().is_empty());
    }

    #[tokio::test]
    async fn tick_reports_instead_of_failing() {
        let store = Arc::new(TestStore::default());
        let (output, mut rx) = AlertOutput::channel(4);
        let ctx = Arc::new(MonitorContext::new(
            MonitorConfig::default(),
            store,
            Arc::new(MemoryLocalStore::new()),
            vec![output],
        ));
        let recorder = Recorder::new(ctx);

        recorder.tick("HH-42").await;

        let toast = rx.try_recv().unwrap();
        assert_eq!(toast.severity, Severity::Error);
        assert_eq!(toast.message, "Personnel not found");
        assert_eq!(toast.gear_id.as_deref(), Some("HH-42"));
    }
}

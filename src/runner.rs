//! Pumping samples from a source into the monitoring engine.

use hardhat_sdk::{MonitoringSessionManager, SaveOutcome};

use crate::source::SampleSource;

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveStats {
    pub samples: u64,
    pub notifications: u64,
}

/// Feed every sample from `source` into `manager` until the source ends.
pub async fn drive<S>(manager: &MonitoringSessionManager, source: &mut S) -> DriveStats
where
    S: SampleSource + ?Sized,
{
    let mut stats = DriveStats::default();
    tracing::info!(source = source.description(), "reading samples");

    while let Some(sample) = source.recv().await {
        stats.samples += 1;
        if manager
            .ingest(&sample.gear_id, sample.sensor, sample.value)
            .is_some()
        {
            stats.notifications += 1;
        }
    }

    tracing::info!(
        samples = stats.samples,
        notifications = stats.notifications,
        "sample source finished"
    );
    stats
}

/// Save everyone currently recording once more, so nothing logged since the
/// last tick is left behind. Returns how many saves succeeded.
pub async fn flush_recordings(manager: &MonitoringSessionManager) -> usize {
    let mut saved = 0;
    for person in manager.monitored() {
        if !manager.is_recording(&person.gear_id) {
            continue;
        }
        match manager.save_now(&person.gear_id).await {
            Ok(SaveOutcome::Saved(_)) => saved += 1,
            Ok(SaveOutcome::Skipped) => {}
            Err(e) => tracing::error!(gear_id = %person.gear_id, error = %e, "final save failed"),
        }
    }
    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChannelSource, Sample, StreamSource};
    use hardhat_sdk::{NOTIFICATIONS_COLLECTION, MemoryRecordStore, Person, SensorType};
    use std::io::Cursor;
    use std::sync::Arc;

    fn manager(store: Arc<MemoryRecordStore>) -> MonitoringSessionManager {
        let manager = MonitoringSessionManager::builder()
            .record_store(store)
            .build()
            .unwrap();
        manager.add_person(Person::new("HH-01", "Ana Reyes", "Nozzle"));
        manager
    }

    #[tokio::test]
    async fn counts_samples_and_transitions() {
        let manager = manager(Arc::new(MemoryRecordStore::new()));
        let lines = [
            r#"{"gearId":"HH-01","sensor":"heartRate","value":90}"#,
            r#"{"gearId":"HH-01","sensor":"heartRate","value":125}"#,
            r#"{"gearId":"HH-01","sensor":"heartRate","value":130}"#,
            r#"{"gearId":"HH-01","sensor":"heartRate","value":95}"#,
            r#"garbage"#,
        ]
        .join("\n");
        let mut source = StreamSource::spawn(Cursor::new(lines), "replay");

        let stats = drive(&manager, &mut source).await;
        // 90 -> normal (first classification), 125 -> critical, 95 -> normal
        assert_eq!(stats, DriveStats { samples: 4, notifications: 3 });
        assert_eq!(manager.notifications().len(), 3);
    }

    #[tokio::test]
    async fn works_through_trait_objects() {
        let manager = manager(Arc::new(MemoryRecordStore::new()));
        let (tx, source) = ChannelSource::create("test", 8);
        let mut source: Box<dyn SampleSource> = Box::new(source);

        tx.send(Sample::new("HH-01", SensorType::SmokeSensor, Some(350.0)))
            .await
            .unwrap();
        drop(tx);

        let stats = drive(&manager, source.as_mut()).await;
        assert_eq!(stats.notifications, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_saves_recording_personnel() {
        let store = Arc::new(MemoryRecordStore::new());
        let manager = manager(store.clone());
        manager.add_person(Person::new("HH-02", "Luis Ortega", "Driver"));
        manager.start_recording("HH-01").unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        manager.ingest("HH-01", SensorType::ToxicGasSensor, Some(75.0));
        assert_eq!(flush_recordings(&manager).await, 1);

        let record_id = manager.monitored()[0].record_id.clone().unwrap();
        assert_eq!(store.collection(&record_id, NOTIFICATIONS_COLLECTION).len(), 1);
        assert_eq!(store.record_count(), 1);
        manager.shutdown();
    }
}

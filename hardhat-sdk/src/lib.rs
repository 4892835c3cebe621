//! # hardhat-sdk
//!
//! Realtime threshold notification and periodic recording engine for smart
//! hard hat monitoring.
//!
//! The engine takes a stream of sensor samples per wearer, announces every
//! change of alert condition exactly once, notices streams that have gone
//! quiet and, while recording is on, periodically writes each wearer's
//! pending notifications and current values to durable storage.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hardhat_sdk::{AlertOutput, MonitoringSessionManager};
//! use hardhat_types::{Person, SensorType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hardhat_sdk::MonitorError> {
//!     let manager = MonitoringSessionManager::builder()
//!         .alert_output(AlertOutput::log())
//!         .build()?;
//!
//!     manager.add_person(Person::new("HH-01", "Ana Reyes", "Nozzle"));
//!
//!     // Feed samples as they arrive from the gear
//!     manager.ingest("HH-01", SensorType::HeartRate, Some(131.0));
//!
//!     // Save now and every 5 seconds until stopped
//!     manager.start_recording("HH-01")?;
//!
//!     // ... the application runs ...
//!
//!     manager.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Edge-triggered alerts**: one notification per condition change, with a dead band between thresholds
//! - **Staleness tracking**: per-stream timeouts, reset on every reading
//! - **Idempotent recording**: one durable record per wearer, no duplicate notification rows
//! - **Restart safe**: the notification log and flags persist to a local store
//! - **Pluggable storage**: implement [`RecordStore`] and [`LocalStore`] for any backend

mod alerts;
mod config;
mod context;
mod error;
mod evaluator;
mod flags;
mod log;
mod manager;
mod recorder;
mod roster;
mod scheduler;
mod staleness;
mod storage;
mod values;

pub use alerts::{AlertOutput, Alerts, Severity, Toast};
pub use config::{MonitorConfig, SensorThreshold, Thresholds};
pub use context::MonitorContext;
pub use error::{MonitorError, StoreError};
pub use evaluator::{classify, evaluate, Transition};
pub use flags::{NotificationFlagStore, FLAGS_KEY};
pub use log::{NotificationLog, DEFAULT_LOG_RETENTION, LOG_KEY};
pub use manager::{
    MonitoringSessionManager, MonitoringSessionManagerBuilder, PersonStatus, SensorStatus,
};
pub use recorder::{Recorder, SaveOutcome, SaveReport};
pub use roster::Roster;
pub use scheduler::RecordingScheduler;
pub use staleness::StalenessWatchers;
pub use storage::{
    Document, LocalStore, MemoryLocalStore, MemoryRecord, MemoryRecordStore, RecordStore,
    NOTIFICATIONS_COLLECTION, REALTIME_COLLECTION,
};
pub use values::{Reading, SensorValueStore};

// Re-export types for convenience
pub use hardhat_types::{Condition, Notification, Person, RealtimeRecord, SensorType};

//! Shared state owned by one running monitor.

use std::sync::Arc;

use crate::alerts::{AlertOutput, Alerts};
use crate::config::MonitorConfig;
use crate::flags::NotificationFlagStore;
use crate::log::NotificationLog;
use crate::roster::Roster;
use crate::staleness::StalenessWatchers;
use crate::storage::{LocalStore, RecordStore};
use crate::values::SensorValueStore;

/// Everything the session manager and its recorder share.
///
/// One instance exists per running monitor and is handed to each component
/// explicitly; nothing here is global.
#[derive(Debug)]
pub struct MonitorContext {
    pub(crate) config: MonitorConfig,
    pub(crate) roster: Roster,
    pub(crate) values: SensorValueStore,
    pub(crate) flags: NotificationFlagStore,
    pub(crate) log: NotificationLog,
    pub(crate) staleness: StalenessWatchers,
    pub(crate) alerts: Alerts,
    pub(crate) records: Arc<dyn RecordStore>,
}

impl MonitorContext {
    /// Build a context, restoring the log and flags from `local`.
    pub fn new(
        config: MonitorConfig,
        records: Arc<dyn RecordStore>,
        local: Arc<dyn LocalStore>,
        outputs: Vec<AlertOutput>,
    ) -> Self {
        Self {
            staleness: StalenessWatchers::new(config.staleness_window),
            roster: Roster::new(),
            values: SensorValueStore::new(),
            flags: NotificationFlagStore::load(Arc::clone(&local)),
            log: NotificationLog::load(local).with_retention(config.log_retention),
            alerts: Alerts::new(outputs),
            records,
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn values(&self) -> &SensorValueStore {
        &self.values
    }

    pub fn flags(&self) -> &NotificationFlagStore {
        &self.flags
    }

    pub fn log(&self) -> &NotificationLog {
        &self.log
    }

    pub fn staleness(&self) -> &StalenessWatchers {
        &self.staleness
    }
}

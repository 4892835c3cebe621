//! Last emitted alert condition per (gear, sensor).

use std::collections::BTreeMap;
use std::sync::Arc;

use hardhat_types::{Condition, SchemaVersion, SensorType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::evaluator::Transition;
use crate::storage::LocalStore;

/// Local store key the flags are persisted under.
pub const FLAGS_KEY: &str = "notificationFlags";

type FlagMap = BTreeMap<String, BTreeMap<SensorType, Condition>>;

#[derive(Serialize, Deserialize)]
struct PersistedFlags {
    version: SchemaVersion,
    flags: FlagMap,
}

/// Remembers the condition each stream last alerted for.
///
/// Used purely for edge detection: an alert fires only when a stream's
/// condition differs from the flag stored here. Every change is written to
/// the local store so a restart does not re-alert on an unchanged condition.
#[derive(Debug)]
pub struct NotificationFlagStore {
    flags: Mutex<FlagMap>,
    local: Arc<dyn LocalStore>,
}

impl NotificationFlagStore {
    /// Load persisted flags, starting empty if none are stored or they are unreadable.
    pub fn load(local: Arc<dyn LocalStore>) -> Self {
        let flags = match local.get(FLAGS_KEY) {
            Ok(Some(text)) => match serde_json::from_str::<PersistedFlags>(&text) {
                Ok(persisted) if persisted.version.is_compatible() => persisted.flags,
                Ok(persisted) => {
                    tracing::warn!(
                        major = persisted.version.major,
                        "discarding notification flags with incompatible schema"
                    );
                    FlagMap::new()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable notification flags");
                    FlagMap::new()
                }
            },
            Ok(None) => FlagMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read notification flags");
                FlagMap::new()
            }
        };

        Self {
            flags: Mutex::new(flags),
            local,
        }
    }

    pub fn get(&self, gear_id: &str, sensor: SensorType) -> Condition {
        self.flags
            .lock()
            .get(gear_id)
            .and_then(|s| s.get(&sensor))
            .copied()
            .unwrap_or_default()
    }

    pub fn set(&self, gear_id: &str, sensor: SensorType, condition: Condition) {
        let mut flags = self.flags.lock();
        flags
            .entry(gear_id.to_string())
            .or_default()
            .insert(sensor, condition);
        self.persist(&flags);
    }

    /// Decide and record a transition in one step.
    ///
    /// `decide` sees the stored flag; if it returns a transition the flag is
    /// updated before the lock is released, so concurrent samples for the same
    /// stream cannot both fire.
    pub fn update<F>(&self, gear_id: &str, sensor: SensorType, decide: F) -> Option<Transition>
    where
        F: FnOnce(Condition) -> Option<Transition>,
    {
        let mut flags = self.flags.lock();
        let previous = flags
            .get(gear_id)
            .and_then(|s| s.get(&sensor))
            .copied()
            .unwrap_or_default();

        let transition = decide(previous)?;
        flags
            .entry(gear_id.to_string())
            .or_default()
            .insert(sensor, transition.to);
        self.persist(&flags);
        Some(transition)
    }

    fn persist(&self, flags: &FlagMap) {
        let persisted = PersistedFlags {
            version: SchemaVersion::current(),
            flags: flags.clone(),
        };
        let result = serde_json::to_string(&persisted)
            .map_err(crate::error::StoreError::from)
            .and_then(|text| self.local.set(FLAGS_KEY, &text));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist notification flags");
        }
    }
}

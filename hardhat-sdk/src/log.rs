//! Append-only, id-deduplicated notification log.

use std::collections::HashSet;
use std::sync::Arc;

use hardhat_types::{Notification, SchemaVersion};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::storage::LocalStore;

/// Local store key the log is persisted under.
pub const LOG_KEY: &str = "notifications";

/// Saved entries kept locally by default. Unsaved entries are never dropped.
pub const DEFAULT_LOG_RETENTION: usize = 1000;

#[derive(Serialize, Deserialize)]
struct PersistedLog {
    version: SchemaVersion,
    entries: Vec<Notification>,
}

#[derive(Debug, Default)]
struct LogState {
    /// Oldest first.
    entries: Vec<Notification>,
    ids: HashSet<String>,
}

impl LogState {
    fn from_entries(entries: Vec<Notification>) -> Self {
        let mut state = LogState::default();
        for entry in entries {
            if state.ids.insert(entry.id.clone()) {
                state.entries.push(entry);
            }
        }
        state
    }

    /// Drop the oldest saved entries beyond `retention`. Returns how many went.
    fn prune(&mut self, retention: usize) -> usize {
        let saved = self.entries.iter().filter(|n| n.saved).count();
        let mut excess = saved.saturating_sub(retention);
        let dropped = excess;
        if dropped == 0 {
            return 0;
        }

        let ids = &mut self.ids;
        self.entries.retain(|n| {
            if excess > 0 && n.saved {
                excess -= 1;
                ids.remove(&n.id);
                false
            } else {
                true
            }
        });
        dropped
    }
}

/// Every notification emitted, persisted locally on each change.
///
/// Entries are unique by id. The only mutation after append is flipping
/// `saved` once the notification reaches durable storage. Saved entries
/// beyond the retention bound are dropped oldest first, so the persisted
/// blob stays bounded; durable storage keeps the full history.
#[derive(Debug)]
pub struct NotificationLog {
    state: Mutex<LogState>,
    local: Arc<dyn LocalStore>,
    retention: usize,
}

impl NotificationLog {
    /// Load the persisted log, starting empty if none is stored or it is unreadable.
    pub fn load(local: Arc<dyn LocalStore>) -> Self {
        let entries = match local.get(LOG_KEY) {
            Ok(Some(text)) => match serde_json::from_str::<PersistedLog>(&text) {
                Ok(persisted) if persisted.version.is_compatible() => persisted.entries,
                Ok(persisted) => {
                    tracing::warn!(
                        major = persisted.version.major,
                        "discarding notification log with incompatible schema"
                    );
                    Vec::new()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable notification log");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read notification log");
                Vec::new()
            }
        };

        let state = LogState::from_entries(entries);
        if !state.entries.is_empty() {
            tracing::info!(
                restored = state.entries.len(),
                unsaved = state.entries.iter().filter(|n| !n.saved).count(),
                "restored notification log"
            );
        }

        Self {
            state: Mutex::new(state),
            local,
            retention: DEFAULT_LOG_RETENTION,
        }
    }

    /// Keep at most `retention` saved entries.
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        if self.state.get_mut().prune(retention) > 0 {
            let state = self.state.lock();
            self.persist(&state);
        }
        self
    }

    /// Append a notification. Returns `false` if its id is already logged.
    pub fn append(&self, notification: Notification) -> bool {
        let mut state = self.state.lock();
        if !state.ids.insert(notification.id.clone()) {
            tracing::debug!(id = %notification.id, "duplicate notification ignored");
            return false;
        }
        state.entries.push(notification);
        self.persist(&state);
        true
    }

    /// Flag matching entries as saved. Returns how many changed.
    pub fn mark_saved(&self, ids: &HashSet<String>) -> usize {
        let mut state = self.state.lock();
        let mut changed = 0;
        for entry in state.entries.iter_mut() {
            if !entry.saved && ids.contains(&entry.id) {
                entry.saved = true;
                changed += 1;
            }
        }
        if changed > 0 {
            let pruned = state.prune(self.retention);
            if pruned > 0 {
                tracing::debug!(pruned, "dropped oldest saved notifications");
            }
            self.persist(&state);
        }
        changed
    }

    /// All entries, newest first.
    pub fn entries(&self) -> Vec<Notification> {
        self.state.lock().entries.iter().rev().cloned().collect()
    }

    /// Entries for one gear, newest first.
    pub fn for_gear(&self, gear_id: &str) -> Vec<Notification> {
        self.state
            .lock()
            .entries
            .iter()
            .rev()
            .filter(|n| n.gear_id == gear_id)
            .cloned()
            .collect()
    }

    /// Entries for one gear not yet written to durable storage, oldest first.
    pub fn unsaved_for(&self, gear_id: &str) -> Vec<Notification> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|n| n.gear_id == gear_id && !n.saved)
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, state: &LogState) {
        let persisted = PersistedLog {
            version: SchemaVersion::current(),
            entries: state.entries.clone(),
        };
        let result = serde_json::to_string(&persisted)
            .map_err(crate::error::StoreError::from)
            .and_then(|text| self.local.set(LOG_KEY, &text));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist notification log");
        }
    }
}

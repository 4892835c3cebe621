//! The set of monitored personnel and their durable record state.

use hardhat_types::Person;
use parking_lot::RwLock;

/// Lifecycle of a person's durable record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordState {
    /// No record yet.
    Idle,
    /// A create call is in flight.
    Creating,
    /// The record exists; `baseline` is set once its identity fields are stored.
    Created { id: String, baseline: bool },
}

/// Result of asking for a person's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordClaim {
    /// The record exists and its identity fields are stored.
    Existing(String),
    /// The record exists but its identity fields have not been stored yet.
    MissingBaseline(String),
    /// The caller now owns creation and must `finish_record` or `abandon_record`.
    Claimed,
    /// Another caller is creating it.
    Busy,
}

#[derive(Debug)]
struct Entry {
    person: Person,
    record: RecordState,
}

/// Monitored personnel, in the order they were added, unique by gear id.
#[derive(Debug, Default)]
pub struct Roster {
    entries: RwLock<Vec<Entry>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a person. Returns `false` if the gear id is already monitored.
    pub fn add(&self, person: Person) -> bool {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.person.gear_id == person.gear_id) {
            return false;
        }
        let record = match &person.record_id {
            Some(id) => RecordState::Created {
                id: id.clone(),
                baseline: true,
            },
            None => RecordState::Idle,
        };
        entries.push(Entry { person, record });
        true
    }

    pub fn remove(&self, gear_id: &str) -> Option<Person> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|e| e.person.gear_id == gear_id)?;
        Some(entries.remove(index).person)
    }

    pub fn get(&self, gear_id: &str) -> Option<Person> {
        self.entries
            .read()
            .iter()
            .find(|e| e.person.gear_id == gear_id)
            .map(|e| e.person.clone())
    }

    pub fn contains(&self, gear_id: &str) -> bool {
        self.entries.read().iter().any(|e| e.person.gear_id == gear_id)
    }

    pub fn list(&self) -> Vec<Person> {
        self.entries.read().iter().map(|e| e.person.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim a person's record, moving `Idle` to `Creating` under the lock.
    ///
    /// Returns `None` if the gear id is not monitored.
    pub(crate) fn claim_record(&self, gear_id: &str) -> Option<RecordClaim> {
        let mut entries = self.entries.write();
        let entry = entries.iter_mut().find(|e| e.person.gear_id == gear_id)?;
        let claim = match &entry.record {
            RecordState::Created { id, baseline: true } => RecordClaim::Existing(id.clone()),
            RecordState::Created { id, baseline: false } => {
                RecordClaim::MissingBaseline(id.clone())
            }
            RecordState::Creating => RecordClaim::Busy,
            RecordState::Idle => {
                entry.record = RecordState::Creating;
                RecordClaim::Claimed
            }
        };
        Some(claim)
    }

    /// Store the id of a freshly created record. The id is set once and kept.
    ///
    /// Returns `false` if the claim no longer exists, for example because the
    /// person was removed while the create was in flight.
    pub(crate) fn finish_record(&self, gear_id: &str, record_id: &str) -> bool {
        let mut entries = self.entries.write();
        let Some(entry) = entries.iter_mut().find(|e| e.person.gear_id == gear_id) else {
            return false;
        };
        if entry.record != RecordState::Creating {
            return false;
        }
        entry.record = RecordState::Created {
            id: record_id.to_string(),
            baseline: false,
        };
        entry.person.record_id = Some(record_id.to_string());
        true
    }

    /// Note that a record's identity fields are stored.
    pub(crate) fn baseline_written(&self, gear_id: &str, record_id: &str) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|e| e.person.gear_id == gear_id) {
            if let RecordState::Created { id, baseline } = &mut entry.record {
                if id == record_id {
                    *baseline = true;
                }
            }
        }
    }

    /// Give up a claim after a failed create so the next save retries.
    pub(crate) fn abandon_record(&self, gear_id: &str) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|e| e.person.gear_id == gear_id) {
            if entry.record == RecordState::Creating {
                entry.record = RecordState::Idle;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(gear_id: &str) -> Person {
        Person::new(gear_id, "Ana Reyes", "Nozzle")
    }

    #[test]
    fn add_dedups_by_gear_id() {
        let roster = Roster::new();
        assert!(roster.add(person("HH-01")));
        assert!(!roster.add(Person::new("HH-01", "Someone Else", "Driver")));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get("HH-01").unwrap().name, "Ana Reyes");
    }

    #[test]
    fn keeps_insertion_order() {
        let roster = Roster::new();
        roster.add(person("HH-03"));
        roster.add(person("HH-01"));
        roster.add(person("HH-02"));
        roster.remove("HH-01");

        let ids: Vec<_> = roster.list().into_iter().map(|p| p.gear_id).collect();
        assert_eq!(ids, vec!["HH-03", "HH-02"]);
    }

    #[test]
    fn record_claim_state_machine() {
        let roster = Roster::new();
        roster.add(person("HH-01"));

        assert_eq!(roster.claim_record("HH-01"), Some(RecordClaim::Claimed));
        assert_eq!(roster.claim_record("HH-01"), Some(RecordClaim::Busy));

        assert!(roster.finish_record("HH-01", "rec-1"));
        assert_eq!(
            roster.claim_record("HH-01"),
            Some(RecordClaim::MissingBaseline("rec-1".to_string()))
        );
        assert_eq!(roster.get("HH-01").unwrap().record_id.as_deref(), Some("rec-1"));

        roster.baseline_written("HH-01", "rec-1");
        assert_eq!(
            roster.claim_record("HH-01"),
            Some(RecordClaim::Existing("rec-1".to_string()))
        );

        // A late finish can't overwrite the id
        assert!(!roster.finish_record("HH-01", "rec-2"));
        assert_eq!(roster.get("HH-01").unwrap().record_id.as_deref(), Some("rec-1"));
    }

    #[test]
    fn finish_after_removal_is_reported() {
        let roster = Roster::new();
        roster.add(person("HH-01"));
        assert_eq!(roster.claim_record("HH-01"), Some(RecordClaim::Claimed));

        roster.remove("HH-01");
        assert!(!roster.finish_record("HH-01", "rec-1"));

        // Re-adding starts from a clean claim
        roster.add(person("HH-01"));
        assert_eq!(roster.claim_record("HH-01"), Some(RecordClaim::Claimed));
    }

    #[test]
    fn abandoned_claim_can_be_retried() {
        let roster = Roster::new();
        roster.add(person("HH-01"));

        assert_eq!(roster.claim_record("HH-01"), Some(RecordClaim::Claimed));
        roster.abandon_record("HH-01");
        assert_eq!(roster.claim_record("HH-01"), Some(RecordClaim::Claimed));
    }

    #[test]
    fn existing_record_id_is_respected() {
        let roster = Roster::new();
        roster.add(person("HH-01").with_record_id("rec-9"));
        assert_eq!(
            roster.claim_record("HH-01"),
            Some(RecordClaim::Existing("rec-9".to_string()))
        );
        assert_eq!(roster.claim_record("HH-99"), None);
    }
}

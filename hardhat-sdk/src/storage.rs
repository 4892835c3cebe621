//! Storage collaborators.
//!
//! Two kinds of persistence back the engine:
//!
//! - [`RecordStore`]: the durable, document-oriented store holding one record
//!   per monitored person with `notifications` and `realtime` sub-collections.
//! - [`LocalStore`]: a device-local key/value store that keeps the
//!   notification log and flags across restarts.
//!
//! In-memory implementations of both are provided for tests and for embedding
//! without a backend; filesystem-backed ones live in `hardhat-adapters`.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A document's fields.
pub type Document = Map<String, Value>;

/// Sub-collection holding persisted notifications.
pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

/// Sub-collection holding periodic sensor snapshots.
pub const REALTIME_COLLECTION: &str = "realtime";

/// Durable record storage.
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// Create an empty record and return its id.
    async fn create_record(&self) -> Result<String, StoreError>;

    /// Merge `fields` into the record's top-level document.
    async fn upsert_fields(&self, record_id: &str, fields: Document) -> Result<(), StoreError>;

    /// Append a document to one of the record's sub-collections.
    async fn append_subrecord(
        &self,
        record_id: &str,
        collection: &str,
        fields: Document,
    ) -> Result<(), StoreError>;

    /// Whether the sub-collection holds a document whose `field` equals `value`.
    async fn exists(
        &self,
        record_id: &str,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<bool, StoreError>;
}

/// Device-local key/value persistence for text blobs.
pub trait LocalStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// A stored durable record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRecord {
    pub fields: Document,
    pub collections: BTreeMap<String, Vec<Document>>,
}

/// In-memory [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<String, MemoryRecord>>,
    next_id: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records created so far.
    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn record(&self, record_id: &str) -> Option<MemoryRecord> {
        self.records.lock().get(record_id).cloned()
    }

    /// Documents of a sub-collection, empty if the record or collection is missing.
    pub fn collection(&self, record_id: &str, collection: &str) -> Vec<Document> {
        self.records
            .lock()
            .get(record_id)
            .and_then(|r| r.collections.get(collection).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create_record(&self) -> Result<String, StoreError> {
        let id = format!("record-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.records.lock().insert(id.clone(), MemoryRecord::default());
        Ok(id)
    }

    async fn upsert_fields(&self, record_id: &str, fields: Document) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(record_id)
            .ok_or_else(|| StoreError::RecordNotFound(record_id.to_string()))?;
        record.fields.extend(fields);
        Ok(())
    }

    async fn append_subrecord(
        &self,
        record_id: &str,
        collection: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(record_id)
            .ok_or_else(|| StoreError::RecordNotFound(record_id.to_string()))?;
        record
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(fields);
        Ok(())
    }

    async fn exists(
        &self,
        record_id: &str,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<bool, StoreError> {
        let records = self.records.lock();
        Ok(records
            .get(record_id)
            .and_then(|r| r.collections.get(collection))
            .map(|docs| docs.iter().any(|doc| doc.get(field) == Some(value)))
            .unwrap_or(false))
    }
}

/// In-memory [`LocalStore`].
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryRecordStore::new();
        let id = store.create_record().await.unwrap();

        store
            .upsert_fields(&id, doc(json!({"gearId": "HH-01"})))
            .await
            .unwrap();
        store
            .upsert_fields(&id, doc(json!({"name": "Ana"})))
            .await
            .unwrap();
        store
            .append_subrecord(&id, NOTIFICATIONS_COLLECTION, doc(json!({"id": "n-1"})))
            .await
            .unwrap();

        let record = store.record(&id).unwrap();
        assert_eq!(record.fields["gearId"], "HH-01");
        assert_eq!(record.fields["name"], "Ana");
        assert!(store
            .exists(&id, NOTIFICATIONS_COLLECTION, "id", &json!("n-1"))
            .await
            .unwrap());
        assert!(!store
            .exists(&id, NOTIFICATIONS_COLLECTION, "id", &json!("n-2"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn writes_to_missing_record_fail() {
        let store = MemoryRecordStore::new();
        let err = store
            .append_subrecord("nope", REALTIME_COLLECTION, Document::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn record_ids_are_unique() {
        let store = MemoryRecordStore::new();
        let a = store.create_record().await.unwrap();
        let b = store.create_record().await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.record_count(), 2);
    }

    #[test]
    fn local_store_overwrites() {
        let store = MemoryLocalStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
    }
}

//! JSON document record store on the local filesystem.
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   <record id>/
//!     record.json          top-level fields, merged on every upsert
//!     notifications.ndjson one document per line
//!     realtime.ndjson
//! ```
//!
//! Record ids are random UUIDs. Mutations are serialized through one async
//! lock per store so concurrent appends never interleave within a line.
//! Lookups by field build an in-memory index from the file on first use and
//! keep it current on every append, so a collection is read at most once.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hardhat_sdk::{Document, RecordStore, StoreError};
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{check_name, AdapterError};

const RECORD_FILE: &str = "record.json";

/// (record id, collection, field)
type IndexKey = (String, String, String);

/// Serialized field values seen per indexed (record, collection, field).
type FieldIndex = HashMap<IndexKey, HashSet<String>>;

/// A [`RecordStore`] writing plain JSON files under a root directory.
#[derive(Debug)]
pub struct JsonRecordStore {
    root: PathBuf,
    index: Mutex<FieldIndex>,
}

impl JsonRecordStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            index: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Top-level fields of a record.
    pub async fn fields(&self, record_id: &str) -> Result<Document, AdapterError> {
        let dir = self.record_dir(record_id).await?;
        read_document(&dir.join(RECORD_FILE)).await
    }

    /// Every document in a sub-collection, in append order.
    pub async fn collection(
        &self,
        record_id: &str,
        collection: &str,
    ) -> Result<Vec<Document>, AdapterError> {
        let dir = self.record_dir(record_id).await?;
        let path = collection_path(&dir, collection)?;

        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut docs = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Document>(line) {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!(
                    record_id,
                    collection,
                    line = index + 1,
                    error = %e,
                    "skipping malformed stored document"
                ),
            }
        }
        Ok(docs)
    }

    /// Ids of every record in the store, sorted.
    pub async fn record_ids(&self) -> Result<Vec<String>, AdapterError> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Directory of an existing record.
    async fn record_dir(&self, record_id: &str) -> Result<PathBuf, AdapterError> {
        check_name(record_id)?;
        let dir = self.root.join(record_id);
        match fs::metadata(dir.join(RECORD_FILE)).await {
            Ok(_) => Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AdapterError::RecordNotFound(record_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self) -> Result<String, AdapterError> {
        let _guard = self.index.lock().await;
        let id = Uuid::new_v4().to_string();
        let dir = self.root.join(&id);
        fs::create_dir_all(&dir).await?;
        write_atomic(&dir.join(RECORD_FILE), b"{}").await?;
        tracing::debug!(record_id = %id, "record created");
        Ok(id)
    }

    async fn upsert(&self, record_id: &str, fields: Document) -> Result<(), AdapterError> {
        let _guard = self.index.lock().await;
        let dir = self.record_dir(record_id).await?;
        let path = dir.join(RECORD_FILE);

        let mut doc = read_document(&path).await?;
        doc.extend(fields);
        write_atomic(&path, &serde_json::to_vec_pretty(&doc)?).await
    }

    async fn append(
        &self,
        record_id: &str,
        collection: &str,
        fields: Document,
    ) -> Result<(), AdapterError> {
        let mut line = serde_json::to_vec(&fields)?;
        line.push(b'\n');

        let mut index = self.index.lock().await;
        let dir = self.record_dir(record_id).await?;
        let path = collection_path(&dir, collection)?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        for ((record, coll, field), values) in index.iter_mut() {
            if record == record_id && coll == collection {
                if let Some(value) = fields.get(field) {
                    values.insert(value.to_string());
                }
            }
        }
        Ok(())
    }

    async fn contains(
        &self,
        record_id: &str,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<bool, AdapterError> {
        let mut index = self.index.lock().await;
        let key = (
            record_id.to_string(),
            collection.to_string(),
            field.to_string(),
        );
        if !index.contains_key(&key) {
            let values = self
                .collection(record_id, collection)
                .await?
                .iter()
                .filter_map(|doc| doc.get(field))
                .map(Value::to_string)
                .collect();
            tracing::debug!(record_id, collection, field, "indexed stored documents");
            index.insert(key.clone(), values);
        }
        Ok(index
            .get(&key)
            .is_some_and(|values| values.contains(&value.to_string())))
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn create_record(&self) -> Result<String, StoreError> {
        Ok(self.create().await?)
    }

    async fn upsert_fields(&self, record_id: &str, fields: Document) -> Result<(), StoreError> {
        Ok(self.upsert(record_id, fields).await?)
    }

    async fn append_subrecord(
        &self,
        record_id: &str,
        collection: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        Ok(self.append(record_id, collection, fields).await?)
    }

    async fn exists(
        &self,
        record_id: &str,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<bool, StoreError> {
        Ok(self.contains(record_id, collection, field, value).await?)
    }
}

fn collection_path(dir: &Path, collection: &str) -> Result<PathBuf, AdapterError> {
    check_name(collection)?;
    Ok(dir.join(format!("{}.ndjson", collection)))
}

async fn read_document(path: &Path) -> Result<Document, AdapterError> {
    let text = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AdapterError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

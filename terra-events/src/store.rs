//! Record persistence seam used by handlers that mutate records.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::event::InstanceRef;

/// A stored record: its reference and its field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub reference: InstanceRef,
    pub fields: Map<String, JsonValue>,
}

impl Record {
    pub fn new(reference: InstanceRef) -> Self {
        Self {
            reference,
            fields: Map::new(),
        }
    }

    /// Set a field value.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }
}

/// Storage for records referenced by events.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load the record `reference` points at.
    async fn fetch(&self, reference: &InstanceRef) -> Result<Option<Record>, StoreError>;

    /// Insert or replace a record.
    async fn save(&self, record: Record) -> Result<(), StoreError>;
}

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<InstanceRef, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly.
    pub fn insert(&self, record: Record) {
        self.records.insert(record.reference.clone(), record);
    }

    /// Copy of the record stored under `reference`.
    pub fn get(&self, reference: &InstanceRef) -> Option<Record> {
        self.records.get(reference).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch(&self, reference: &InstanceRef) -> Result<Option<Record>, StoreError> {
        Ok(self.get(reference))
    }

    async fn save(&self, record: Record) -> Result<(), StoreError> {
        self.insert(record);
        Ok(())
    }
}

/// Record store backed by a single JSON file.
///
/// The file holds one object keyed by the record reference
/// (`"model:id"`), each value being the record's fields. A missing file
/// is an empty store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, JsonValue>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn fetch(&self, reference: &InstanceRef) -> Result<Option<Record>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_all().await?;

        match records.remove(&reference.to_string()) {
            Some(JsonValue::Object(fields)) => Ok(Some(Record {
                reference: reference.clone(),
                fields,
            })),
            Some(other) => Err(StoreError::Backend(format!(
                "record {} is not an object: {}",
                reference, other
            ))),
            None => Ok(None),
        }
    }

    async fn save(&self, record: Record) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_all().await?;
        let key = record.reference.to_string();

        records.insert(key.clone(), JsonValue::Object(record.fields));
        let content = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&self.path, content).await?;

        debug!(record = %key, path = %self.path.display(), "Saved record");
        Ok(())
    }
}

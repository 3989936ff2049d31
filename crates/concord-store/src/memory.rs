//! In-process backend keeping records in an ordered map.

use std::collections::BTreeMap;

use async_trait::async_trait;
use concord_core::entities::{ProcessRecord, RecordRef};
use concord_core::enums::BackendKind;
use tokio::sync::RwLock;

use crate::adapter::{BackendAdapter, RecordFilter, RecordReader, record_ref};
use crate::error::StoreError;

pub struct MemoryStore {
    name: String,
    kind: BackendKind,
    records: RwLock<BTreeMap<String, ProcessRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: BackendKind) -> Self {
        Self {
            name: name.into(),
            kind,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Upsert without the create/update contract. Seeds fixtures and
    /// simulates out-of-band writes.
    pub async fn put(&self, record: ProcessRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.records.read().await.contains_key(id)
    }
}

#[async_trait]
impl RecordReader for MemoryStore {
    async fn read(&self, id: &str) -> Result<Option<ProcessRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ProcessRecord>, StoreError> {
        let records = self.records.read().await;
        let matching = records.values().filter(|record| filter.matches(record));
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        })
    }
}

#[async_trait]
impl BackendAdapter for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn create(&self, record: &ProcessRecord) -> Result<RecordRef, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::already_exists(&self.name, &record.id));
        }
        records.insert(record.id.clone(), record.clone());
        tracing::debug!(backend = %self.name, record_id = %record.id, "memory: created");
        Ok(record_ref(&self.name, record))
    }

    async fn update(&self, record: &ProcessRecord) -> Result<RecordRef, StoreError> {
        let mut records = self.records.write().await;
        let Some(slot) = records.get_mut(&record.id) else {
            return Err(StoreError::not_found(&self.name, &record.id));
        };
        *slot = record.clone();
        tracing::debug!(backend = %self.name, record_id = %record.id, "memory: updated");
        Ok(record_ref(&self.name, record))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.records.write().await.remove(id).is_some();
        tracing::debug!(backend = %self.name, record_id = %id, removed, "memory: deleted");
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

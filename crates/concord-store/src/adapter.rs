//! The contract every backend adapter implements.
//!
//! Reads are side-effect free and may run concurrently with in-flight
//! transactions. Writes are single-record and idempotency is not assumed:
//! `create` refuses an existing id and `update` refuses a missing one, so a
//! compensator can tell "undo my write" apart from "someone else wrote".

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concord_core::entities::{ProcessRecord, RecordRef};
use concord_core::enums::BackendKind;

use crate::error::StoreError;

/// Narrows a `list` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub domain: Option<String>,
    pub updated_since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    /// Every record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub const fn with_updated_since(mut self, since: DateTime<Utc>) -> Self {
        self.updated_since = Some(since);
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `record` passes the domain and timestamp predicates.
    /// `limit` is applied by the caller over the ordered result.
    #[must_use]
    pub fn matches(&self, record: &ProcessRecord) -> bool {
        if let Some(domain) = &self.domain {
            if &record.domain != domain {
                return false;
            }
        }
        if let Some(since) = self.updated_since {
            if record.updated_at < since {
                return false;
            }
        }
        true
    }
}

/// Read path shared by live adapters and legacy sources.
#[async_trait]
pub trait RecordReader: Send + Sync {
    /// Fetch one record. `Ok(None)` when the id is unknown.
    async fn read(&self, id: &str) -> Result<Option<ProcessRecord>, StoreError>;

    /// Records matching `filter`, ordered by id.
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ProcessRecord>, StoreError>;
}

/// A writable backend taking part in saga transactions.
#[async_trait]
pub trait BackendAdapter: RecordReader {
    /// Stable backend name used in steps, gaps, and logs.
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// Insert a new record.
    ///
    /// Fails with `StoreError::AlreadyExists` if the id is present.
    async fn create(&self, record: &ProcessRecord) -> Result<RecordRef, StoreError>;

    /// Replace an existing record.
    ///
    /// Fails with `StoreError::NotFound` if the id is absent.
    async fn update(&self, record: &ProcessRecord) -> Result<RecordRef, StoreError>;

    /// Remove a record. Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), StoreError>;
}

pub type SharedAdapter = Arc<dyn BackendAdapter>;

/// Build the reference a write returns.
#[must_use]
pub fn record_ref(backend: &str, record: &ProcessRecord) -> RecordRef {
    RecordRef {
        backend: backend.to_string(),
        id: record.id.clone(),
        updated_at: record.updated_at,
    }
}

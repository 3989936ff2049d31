//! Fault-injecting wrapper around any adapter.
//!
//! Used to exercise compensation, retry, and timeout paths without a real
//! flaky backend.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use concord_core::entities::{ProcessRecord, RecordRef};
use concord_core::enums::BackendKind;

use crate::adapter::{BackendAdapter, RecordFilter, RecordReader, SharedAdapter};
use crate::error::StoreError;

/// Adapter call that a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterCall {
    Read,
    List,
    Create,
    Update,
    Delete,
    Ping,
}

impl fmt::Display for AdapterCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Ping => "ping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
enum Fault {
    /// Every call fails with `StoreError::Rejected`.
    Reject(String),
    /// The next `remaining` calls fail with `StoreError::Unavailable`.
    Unavailable { remaining: u32 },
}

pub struct FaultyStore {
    inner: SharedAdapter,
    faults: Mutex<HashMap<AdapterCall, Fault>>,
    latency: Mutex<HashMap<AdapterCall, Duration>>,
    calls: Mutex<HashMap<AdapterCall, u32>>,
}

impl FaultyStore {
    #[must_use]
    pub fn new(inner: SharedAdapter) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashMap::new()),
            latency: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Make every `call` fail until cleared.
    pub fn fail_permanently(&self, call: AdapterCall, reason: impl Into<String>) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call, Fault::Reject(reason.into()));
    }

    /// Make the next `times` invocations of `call` report the backend as
    /// unavailable.
    pub fn fail_transiently(&self, call: AdapterCall, times: u32) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call, Fault::Unavailable { remaining: times });
    }

    /// Delay every `call` by `delay` before it reaches the inner adapter.
    pub fn delay(&self, call: AdapterCall, delay: Duration) {
        self.latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(call, delay);
    }

    /// Remove the fault and latency attached to `call`.
    pub fn clear(&self, call: AdapterCall) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&call);
        self.latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&call);
    }

    /// Number of times `call` was invoked, faulted or not.
    #[must_use]
    pub fn calls(&self, call: AdapterCall) -> u32 {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&call)
            .copied()
            .unwrap_or(0)
    }

    async fn gate(&self, call: AdapterCall) -> Result<(), StoreError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(call)
            .or_insert(0) += 1;

        let delay = self
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&call)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        let backend = self.inner.name().to_string();
        match faults.get_mut(&call) {
            Some(Fault::Reject(reason)) => Err(StoreError::Rejected {
                backend,
                operation: call.to_string(),
                reason: reason.clone(),
            }),
            Some(Fault::Unavailable { remaining }) if *remaining > 0 => {
                *remaining -= 1;
                if *remaining == 0 {
                    faults.remove(&call);
                }
                Err(StoreError::Unavailable {
                    backend,
                    reason: format!("injected outage on {call}"),
                })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RecordReader for FaultyStore {
    async fn read(&self, id: &str) -> Result<Option<ProcessRecord>, StoreError> {
        self.gate(AdapterCall::Read).await?;
        self.inner.read(id).await
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ProcessRecord>, StoreError> {
        self.gate(AdapterCall::List).await?;
        self.inner.list(filter).await
    }
}

#[async_trait]
impl BackendAdapter for FaultyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn create(&self, record: &ProcessRecord) -> Result<RecordRef, StoreError> {
        self.gate(AdapterCall::Create).await?;
        self.inner.create(record).await
    }

    async fn update(&self, record: &ProcessRecord) -> Result<RecordRef, StoreError> {
        self.gate(AdapterCall::Update).await?;
        self.inner.update(record).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.gate(AdapterCall::Delete).await?;
        self.inner.delete(id).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.gate(AdapterCall::Ping).await?;
        self.inner.ping().await
    }
}

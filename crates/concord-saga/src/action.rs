//! Behaviour bound to saga steps.
//!
//! A `SagaStep` is pure data. The code that performs and undoes the write is
//! a [`StepAction`] held by the open transaction next to its step.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use concord_core::entities::ProcessRecord;
use concord_core::enums::StepOperation;
use concord_store::{SharedAdapter, StoreError};
use serde_json::{Value, json};

/// A forward write and its compensating action.
#[async_trait]
pub trait StepAction: Send + Sync {
    /// Apply the write. The returned value is stored as the step result and
    /// handed back to [`StepAction::compensate`].
    async fn forward(&self) -> Result<Value, StoreError>;

    /// Undo a successful [`StepAction::forward`].
    async fn compensate(&self, result: &Value) -> Result<(), StoreError>;
}

enum Write {
    Create(ProcessRecord),
    Update(ProcessRecord),
    Delete(String),
}

/// The image read before an update or delete.
enum Prior {
    /// The forward call stopped before its read; nothing was written.
    Unread,
    Read(Option<ProcessRecord>),
}

/// A single-record write against one adapter.
///
/// - create is undone by delete
/// - update is undone by restoring the image read before the write, or by
///   delete if there was none
/// - delete is undone by recreating the image read before the write
///
/// Compensation also works when the forward call was cut short and may or
/// may not have landed.
pub struct AdapterAction {
    adapter: SharedAdapter,
    write: Write,
    prior: Mutex<Prior>,
}

impl AdapterAction {
    #[must_use]
    pub fn create(adapter: SharedAdapter, record: ProcessRecord) -> Self {
        Self::new(adapter, Write::Create(record))
    }

    #[must_use]
    pub fn update(adapter: SharedAdapter, record: ProcessRecord) -> Self {
        Self::new(adapter, Write::Update(record))
    }

    #[must_use]
    pub fn delete(adapter: SharedAdapter, id: impl Into<String>) -> Self {
        Self::new(adapter, Write::Delete(id.into()))
    }

    fn new(adapter: SharedAdapter, write: Write) -> Self {
        Self {
            adapter,
            write,
            prior: Mutex::new(Prior::Unread),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &str {
        self.adapter.name()
    }

    #[must_use]
    pub const fn operation(&self) -> StepOperation {
        match self.write {
            Write::Create(_) => StepOperation::Create,
            Write::Update(_) => StepOperation::Update,
            Write::Delete(_) => StepOperation::Delete,
        }
    }

    #[must_use]
    pub fn record_id(&self) -> &str {
        match &self.write {
            Write::Create(record) | Write::Update(record) => &record.id,
            Write::Delete(id) => id,
        }
    }

    async fn capture_prior(&self) -> Result<(), StoreError> {
        let prior = self.adapter.read(self.record_id()).await?;
        *self.prior.lock().unwrap_or_else(PoisonError::into_inner) = Prior::Read(prior);
        Ok(())
    }

    /// `None` if the forward call never got as far as its read.
    fn prior(&self) -> Option<Option<ProcessRecord>> {
        match &*self.prior.lock().unwrap_or_else(PoisonError::into_inner) {
            Prior::Unread => None,
            Prior::Read(prior) => Some(prior.clone()),
        }
    }

    /// Put `image` back whether or not the record currently exists.
    async fn restore(&self, image: &ProcessRecord) -> Result<(), StoreError> {
        if self.adapter.read(&image.id).await?.is_some() {
            self.adapter.update(image).await?;
        } else {
            self.adapter.create(image).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StepAction for AdapterAction {
    async fn forward(&self) -> Result<Value, StoreError> {
        match &self.write {
            Write::Create(record) => {
                let reference = self.adapter.create(record).await?;
                Ok(json!(reference))
            }
            Write::Update(record) => {
                self.capture_prior().await?;
                let reference = self.adapter.update(record).await?;
                Ok(json!(reference))
            }
            Write::Delete(id) => {
                self.capture_prior().await?;
                let deleted = self.adapter.delete(id).await?;
                Ok(json!({ "backend": self.backend(), "id": id, "deleted": deleted }))
            }
        }
    }

    async fn compensate(&self, _result: &Value) -> Result<(), StoreError> {
        match &self.write {
            Write::Create(record) => {
                self.adapter.delete(&record.id).await?;
            }
            Write::Update(record) => match self.prior() {
                None => {}
                Some(Some(prior)) => self.restore(&prior).await?,
                Some(None) => {
                    self.adapter.delete(&record.id).await?;
                }
            },
            Write::Delete(_) => {
                if let Some(Some(prior)) = self.prior() {
                    self.restore(&prior).await?;
                }
            }
        }
        Ok(())
    }
}

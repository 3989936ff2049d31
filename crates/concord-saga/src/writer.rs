//! Turns process write requests into three-step transactions.
//!
//! Write order is fixed: structured store (source of truth), then graph,
//! then vector. The embedding only travels to the vector store.

use std::sync::Arc;

use concord_core::entities::ProcessEntity;
use concord_core::errors::CoreError;
use concord_core::transaction::Transaction;
use concord_store::SharedAdapter;

use crate::action::AdapterAction;
use crate::coordinator::SagaCoordinator;
use crate::error::SagaError;

pub struct ProcessWriter {
    coordinator: Arc<SagaCoordinator>,
    structured: SharedAdapter,
    graph: SharedAdapter,
    vector: SharedAdapter,
}

impl ProcessWriter {
    #[must_use]
    pub const fn new(
        coordinator: Arc<SagaCoordinator>,
        structured: SharedAdapter,
        graph: SharedAdapter,
        vector: SharedAdapter,
    ) -> Self {
        Self {
            coordinator,
            structured,
            graph,
            vector,
        }
    }

    #[must_use]
    pub const fn coordinator(&self) -> &Arc<SagaCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub const fn structured(&self) -> &SharedAdapter {
        &self.structured
    }

    /// Create the process in all three stores.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Validation` before any step runs if the entity is
    /// invalid, or a `begin` error if no transaction could be opened.
    pub async fn create(
        &self,
        entity: &ProcessEntity,
        embedding: Option<Vec<f32>>,
    ) -> Result<Transaction, SagaError> {
        let record = validated(entity)?.to_record()?;
        let mut tx = self.coordinator.begin("create_process", &entity.id).await?;
        tx.add_adapter_step(AdapterAction::create(Arc::clone(&self.structured), record.clone()))
            .add_adapter_step(AdapterAction::create(Arc::clone(&self.graph), record.clone()))
            .add_adapter_step(AdapterAction::create(
                Arc::clone(&self.vector),
                record.with_embedding(embedding),
            ));
        Ok(self.coordinator.run(tx).await)
    }

    /// Replace the process in all three stores.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub async fn update(
        &self,
        entity: &ProcessEntity,
        embedding: Option<Vec<f32>>,
    ) -> Result<Transaction, SagaError> {
        let record = validated(entity)?.to_record()?;
        let mut tx = self.coordinator.begin("update_process", &entity.id).await?;
        tx.add_adapter_step(AdapterAction::update(Arc::clone(&self.structured), record.clone()))
            .add_adapter_step(AdapterAction::update(Arc::clone(&self.graph), record.clone()))
            .add_adapter_step(AdapterAction::update(
                Arc::clone(&self.vector),
                record.with_embedding(embedding),
            ));
        Ok(self.coordinator.run(tx).await)
    }

    /// Create or update depending on whether the source of truth already
    /// holds the id.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`], plus `SagaError::Store` if the existence
    /// check fails.
    pub async fn save(
        &self,
        entity: &ProcessEntity,
        embedding: Option<Vec<f32>>,
    ) -> Result<Transaction, SagaError> {
        validated(entity)?;
        if self.structured.read(&entity.id).await?.is_some() {
            self.update(entity, embedding).await
        } else {
            self.create(entity, embedding).await
        }
    }

    /// Remove the process from all three stores.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Validation` for a blank id, or a `begin` error.
    pub async fn delete(&self, id: &str) -> Result<Transaction, SagaError> {
        if id.trim().is_empty() {
            return Err(SagaError::Validation("process id must not be empty".into()));
        }
        let mut tx = self.coordinator.begin("delete_process", id).await?;
        tx.add_adapter_step(AdapterAction::delete(Arc::clone(&self.structured), id))
            .add_adapter_step(AdapterAction::delete(Arc::clone(&self.graph), id))
            .add_adapter_step(AdapterAction::delete(Arc::clone(&self.vector), id));
        Ok(self.coordinator.run(tx).await)
    }
}

fn validated(entity: &ProcessEntity) -> Result<&ProcessEntity, SagaError> {
    match entity.validate() {
        Ok(()) => Ok(entity),
        Err(CoreError::Validation(message)) => Err(SagaError::Validation(message)),
        Err(other) => Err(other.into()),
    }
}

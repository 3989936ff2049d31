//! Saga error types.
//!
//! Step failures never surface here: they become transaction transitions
//! and the caller receives a terminal `Transaction`. These errors cover the
//! cases where no transaction could be started at all.

use concord_core::errors::CoreError;
use concord_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SagaError {
    /// The entity was rejected before any step ran.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The per-entity lock could not be taken within the transaction budget.
    #[error("Timed out after {waited_ms} ms waiting for the lock on {entity_id}")]
    LockTimeout { entity_id: String, waited_ms: u64 },

    /// The registry is draining and refuses new transactions.
    #[error("Transaction registry is shutting down")]
    Draining,

    /// The registry refused an event.
    #[error("Registry error: {0}")]
    Registry(String),

    /// A terminal transaction was archived in memory but not journaled.
    #[error("Journal error: {0}")]
    Journal(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SagaError {
    /// Whether starting the same transaction again later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::LockTimeout { .. } => true,
            Self::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

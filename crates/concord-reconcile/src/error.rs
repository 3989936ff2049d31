//! Reconciliation error types.

use concord_core::errors::CoreError;
use concord_saga::SagaError;
use concord_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A gap or request names a backend the engine does not manage.
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// The fix report could not be written.
    #[error("Report error: {0}")]
    Report(String),

    #[error(transparent)]
    Saga(#[from] SagaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

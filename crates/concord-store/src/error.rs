//! Store error types for concord-store.

use concord_core::errors::CoreError;
use thiserror::Error;

/// Errors from backend adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist in the backend.
    #[error("Record {id} not found in {backend}")]
    NotFound { backend: String, id: String },

    /// A create hit an existing record.
    #[error("Record {id} already exists in {backend}")]
    AlreadyExists { backend: String, id: String },

    /// The backend could not be reached. Transient; callers may retry.
    #[error("Backend {backend} unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    /// The backend refused the operation. Not retried.
    #[error("Backend {backend} rejected {operation}: {reason}")]
    Rejected {
        backend: String,
        operation: String,
        reason: String,
    },

    /// A SQL query failed or returned malformed data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub(crate) fn not_found(backend: &str, id: &str) -> Self {
        Self::NotFound {
            backend: backend.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(backend: &str, id: &str) -> Self {
        Self::AlreadyExists {
            backend: backend.to_string(),
            id: id.to_string(),
        }
    }
}

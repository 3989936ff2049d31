//! Structured outcome types returned to callers and printed by `concord`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{BackendKind, StepOperation, TransactionState};

/// User-visible result of a transaction: never a raw error.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub transaction_id: String,
    pub label: String,
    pub state: TransactionState,
    pub error: Option<String>,
    pub affected_ids: Vec<String>,
    pub residual_steps: Vec<ResidualStep>,
}

/// A step whose write survived a failed compensation sweep.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ResidualStep {
    pub backend: String,
    pub operation: StepOperation,
    pub record_id: String,
    pub error: Option<String>,
}

/// Reachability and latency of one backend.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct BackendHealth {
    pub backend: String,
    pub kind: BackendKind,
    pub reachable: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Result of importing a legacy export.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MigrationSummary {
    pub scanned: u32,
    pub imported: u32,
    pub already_present: u32,
    pub invalid: Vec<String>,
    pub failed: Vec<TransactionOutcome>,
    pub duration_ms: u64,
}

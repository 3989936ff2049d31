//! Status enums, backend kinds, gap types, and fix strategies for Concord.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! Status enums with state machines provide `allowed_next_states()` to enforce
//! valid transitions at the application layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// BackendKind
// ---------------------------------------------------------------------------

/// The role a backing store plays for the process entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Structured transactional store. Source of truth.
    Structured,
    /// Relationship / graph projection.
    Graph,
    /// Similarity / embedding projection.
    Vector,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Graph => "graph",
            Self::Vector => "vector",
        }
    }

    /// Whether this backend holds a derived projection rather than the
    /// authoritative copy.
    #[must_use]
    pub const fn is_derived(self) -> bool {
        !matches!(self, Self::Structured)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StepOperation
// ---------------------------------------------------------------------------

/// Write operation a saga step performs against its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepOperation {
    Create,
    Update,
    Delete,
}

impl StepOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for StepOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StepState
// ---------------------------------------------------------------------------

/// Execution state of one saga step.
///
/// ```text
/// pending → executed → compensated
///         → failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Executed,
    Failed,
    Compensated,
}

impl StepState {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Executed, Self::Failed],
            Self::Executed => &[Self::Compensated],
            Self::Failed | Self::Compensated => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::Compensated => "compensated",
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TransactionState
// ---------------------------------------------------------------------------

/// Lifecycle of a saga transaction.
///
/// ```text
/// pending → in_progress → committed
///                       → compensating → rolled_back
///                                      → failed
/// pending → rolled_back (cancelled before run)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Pending,
    InProgress,
    Committed,
    Compensating,
    RolledBack,
    Failed,
}

impl TransactionState {
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::InProgress, Self::RolledBack],
            Self::InProgress => &[Self::Committed, Self::Compensating],
            Self::Compensating => &[Self::RolledBack, Self::Failed],
            Self::Committed | Self::RolledBack | Self::Failed => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Terminal states have no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Committed => "committed",
            Self::Compensating => "compensating",
            Self::RolledBack => "rolled_back",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "committed" => Ok(Self::Committed),
            "compensating" => Ok(Self::Compensating),
            "rolled_back" => Ok(Self::RolledBack),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown transaction state '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// GapType
// ---------------------------------------------------------------------------

/// Kind of divergence between the source of truth and a derived store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    MissingRecord,
    OrphanedRecord,
    IncompleteMigration,
    VersionConflict,
    SchemaMismatch,
}

impl GapType {
    /// Severity assigned at detection time.
    #[must_use]
    pub const fn default_severity(self) -> Severity {
        match self {
            Self::MissingRecord | Self::OrphanedRecord => Severity::High,
            Self::IncompleteMigration | Self::VersionConflict => Severity::Medium,
            Self::SchemaMismatch => Severity::Critical,
        }
    }

    /// Whether a gap of this type can be repaired without a human.
    #[must_use]
    pub const fn is_auto_fixable(self) -> bool {
        !matches!(self, Self::SchemaMismatch)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingRecord => "missing_record",
            Self::OrphanedRecord => "orphaned_record",
            Self::IncompleteMigration => "incomplete_migration",
            Self::VersionConflict => "version_conflict",
            Self::SchemaMismatch => "schema_mismatch",
        }
    }
}

impl fmt::Display for GapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Gap severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FixStrategy
// ---------------------------------------------------------------------------

/// Repair strategy applied to a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FixStrategy {
    CopyFromSource,
    DeleteFromTarget,
    UpdateTarget,
    MergeData,
    Skip,
}

impl FixStrategy {
    /// Strategies that mutate a backend and therefore need an operator's
    /// confirmation in interactive flows.
    #[must_use]
    pub const fn requires_confirmation(self) -> bool {
        matches!(
            self,
            Self::CopyFromSource | Self::DeleteFromTarget | Self::MergeData
        )
    }

    /// Whether the derived record is snapshotted before the strategy runs.
    /// Copying creates a record that did not exist, so there is nothing to
    /// snapshot.
    #[must_use]
    pub const fn takes_backup(self) -> bool {
        matches!(
            self,
            Self::DeleteFromTarget | Self::UpdateTarget | Self::MergeData
        )
    }

    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::Skip)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CopyFromSource => "copy_from_source",
            Self::DeleteFromTarget => "delete_from_target",
            Self::UpdateTarget => "update_target",
            Self::MergeData => "merge_data",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for FixStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FixStatus
// ---------------------------------------------------------------------------

/// Status of a fix action.
///
/// ```text
/// pending ⇄ planned        (dry run)
///         → success
///         → failed
///         → skipped
///         → rolled_back
/// ```
///
/// `pending` doubles as the awaiting-confirmation marker: an action refused
/// for lack of confirmation stays `pending`. A `planned` action goes back to
/// `pending` when it is executed for real.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Pending,
    Planned,
    Success,
    Failed,
    Skipped,
    RolledBack,
}

impl FixStatus {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[
                Self::Planned,
                Self::Success,
                Self::Failed,
                Self::Skipped,
                Self::RolledBack,
            ],
            Self::Planned => &[Self::Pending],
            Self::Success
            | Self::Failed
            | Self::Skipped
            | Self::RolledBack => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Whether the action reached one of its outcome states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Skipped | Self::RolledBack
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Planned => "planned",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for FixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Audit-facing saga records.
//!
//! `Transaction` and `SagaStep` are pure data: they serialize into the
//! registry journal and the CLI output. The behaviour that executes or
//! compensates a step is bound elsewhere (`concord-saga`), next to these
//! records rather than inside them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{StepOperation, StepState, TransactionState};
use crate::errors::CoreError;
use crate::responses::{ResidualStep, TransactionOutcome};

/// One write of a transaction and its execution state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SagaStep {
    pub index: usize,
    pub backend: String,
    pub operation: StepOperation,
    pub record_id: String,
    pub state: StepState,
    /// Forward attempts made, including retries of transient failures.
    pub attempts: u32,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Set when the compensator itself failed; the step stays `executed`.
    pub compensation_error: Option<String>,
    /// The forward call timed out, so the write may have landed. Cleared
    /// once the compensator has run.
    #[serde(default)]
    pub in_doubt: bool,
    pub executed_at: Option<DateTime<Utc>>,
    pub compensated_at: Option<DateTime<Utc>>,
}

impl SagaStep {
    #[must_use]
    pub fn new(
        index: usize,
        backend: impl Into<String>,
        operation: StepOperation,
        record_id: impl Into<String>,
    ) -> Self {
        Self {
            index,
            backend: backend.into(),
            operation,
            record_id: record_id.into(),
            state: StepState::Pending,
            attempts: 0,
            result: None,
            error: None,
            compensation_error: None,
            in_doubt: false,
            executed_at: None,
            compensated_at: None,
        }
    }

    fn transition(&mut self, next: StepState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity_type: "saga_step".into(),
                id: format!("{}#{}", self.backend, self.index),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the step is pending.
    pub fn mark_executed(&mut self, result: serde_json::Value) -> Result<(), CoreError> {
        self.transition(StepState::Executed)?;
        self.result = Some(result);
        self.executed_at = Some(Utc::now());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the step is pending.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), CoreError> {
        self.transition(StepState::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Fail a step whose outcome is unknown.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the step is pending.
    pub fn mark_in_doubt(&mut self, error: impl Into<String>) -> Result<(), CoreError> {
        self.mark_failed(error)?;
        self.in_doubt = true;
        Ok(())
    }

    /// Whether a compensation sweep has to undo this step.
    #[must_use]
    pub fn needs_compensation(&self) -> bool {
        self.state == StepState::Executed || self.in_doubt
    }

    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the step is executed or
    /// in doubt.
    pub fn mark_compensated(&mut self) -> Result<(), CoreError> {
        if self.in_doubt {
            self.in_doubt = false;
            self.compensated_at = Some(Utc::now());
            return Ok(());
        }
        self.transition(StepState::Compensated)?;
        self.compensated_at = Some(Utc::now());
        Ok(())
    }

    /// Record a failed compensator without changing state.
    pub fn record_compensation_failure(&mut self, error: impl Into<String>) {
        self.compensation_error = Some(error.into());
    }
}

/// A saga transaction: an ordered list of steps against several backends.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub label: String,
    pub entity_id: String,
    pub state: TransactionState,
    pub steps: Vec<SagaStep>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Transaction {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            entity_id: entity_id.into(),
            state: TransactionState::Pending,
            steps: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    /// Move to `next`, stamping `finished_at` on terminal states.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` if the state machine does not
    /// allow the move.
    pub fn transition(&mut self, next: TransactionState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity_type: "transaction".into(),
                id: self.id.clone(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Steps still applied after a compensation sweep.
    #[must_use]
    pub fn residual_steps(&self) -> Vec<&SagaStep> {
        if self.state == TransactionState::Committed {
            return Vec::new();
        }
        self.steps
            .iter()
            .filter(|step| step.needs_compensation())
            .collect()
    }

    /// Distinct record ids touched by this transaction, in step order.
    #[must_use]
    pub fn affected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for step in &self.steps {
            if !ids.contains(&step.record_id) {
                ids.push(step.record_id.clone());
            }
        }
        ids
    }

    /// Structured status object for callers.
    #[must_use]
    pub fn outcome(&self) -> TransactionOutcome {
        TransactionOutcome {
            transaction_id: self.id.clone(),
            label: self.label.clone(),
            state: self.state,
            error: self.error.clone(),
            affected_ids: self.affected_ids(),
            residual_steps: self
                .residual_steps()
                .into_iter()
                .map(|step| ResidualStep {
                    backend: step.backend.clone(),
                    operation: step.operation,
                    record_id: step.record_id.clone(),
                    error: step.compensation_error.clone(),
                })
                .collect(),
        }
    }
}

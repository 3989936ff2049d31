//! The SAGA coordinator.
//!
//! ```text
//! begin ──► PENDING ──run──► IN_PROGRESS ──all steps ok──► COMMITTED
//!              │                   │
//!            cancel           step failed / budget exceeded
//!              │                   ▼
//!              ▼             COMPENSATING ──all undone──► ROLLED_BACK
//!         ROLLED_BACK              └────residue left────► FAILED
//! ```
//!
//! Steps run strictly in insertion order; compensation walks the executed
//! steps in reverse. A step that timed out may still have landed, so it is
//! compensated too. A failing compensator is recorded on its step and the
//! sweep continues. `run` always returns a terminal [`Transaction`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use concord_config::CoordinatorConfig;
use concord_core::enums::{StepOperation, TransactionState};
use concord_core::errors::CoreError;
use concord_core::ids::{PREFIX_TRANSACTION, generate_id};
use concord_core::transaction::{SagaStep, Transaction};
use concord_store::RetryPolicy;
use serde_json::Value;

use crate::action::{AdapterAction, StepAction};
use crate::error::SagaError;
use crate::locks::{EntityLockGuard, EntityLocks};
use crate::registry::TransactionRegistry;

/// Timing and retry settings for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Budget from `begin` to the end of the forward pass.
    pub transaction_timeout: Duration,
    /// Bound on each compensator.
    pub compensation_timeout: Duration,
    /// Step-level retry of unavailable backends.
    pub retry: RetryPolicy,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self::from(&CoordinatorConfig::default())
    }
}

impl From<&CoordinatorConfig> for CoordinatorOptions {
    fn from(config: &CoordinatorConfig) -> Self {
        Self {
            transaction_timeout: config.transaction_timeout(),
            compensation_timeout: config.compensation_timeout(),
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

pub struct SagaCoordinator {
    locks: Arc<EntityLocks>,
    registry: Arc<TransactionRegistry>,
    options: CoordinatorOptions,
}

/// An open transaction: its record, the actions bound to its steps, and the
/// entity lock it holds until it reaches a terminal state.
pub struct SagaTransaction {
    record: Transaction,
    actions: Vec<Box<dyn StepAction>>,
    deadline: Instant,
    _lock: EntityLockGuard,
}

impl SagaTransaction {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    #[must_use]
    pub const fn record(&self) -> &Transaction {
        &self.record
    }

    /// Append a step for the transaction's entity. Steps run in the order
    /// they are added: source of truth first, derived stores after.
    pub fn add_step(
        &mut self,
        backend: impl Into<String>,
        operation: StepOperation,
        action: Box<dyn StepAction>,
    ) -> &mut Self {
        let index = self.record.steps.len();
        let step = SagaStep::new(index, backend, operation, self.record.entity_id.clone());
        self.record.steps.push(step);
        self.actions.push(action);
        self
    }

    /// Append a step whose backend and operation come from the action.
    pub fn add_adapter_step(&mut self, action: AdapterAction) -> &mut Self {
        let backend = action.backend().to_string();
        let operation = action.operation();
        self.add_step(backend, operation, Box::new(action))
    }
}

impl SagaCoordinator {
    #[must_use]
    pub fn new(registry: Arc<TransactionRegistry>, options: CoordinatorOptions) -> Self {
        Self::with_locks(EntityLocks::new(), registry, options)
    }

    /// Build a coordinator sharing an existing lock table.
    #[must_use]
    pub const fn with_locks(
        locks: Arc<EntityLocks>,
        registry: Arc<TransactionRegistry>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            locks,
            registry,
            options,
        }
    }

    #[must_use]
    pub const fn locks(&self) -> &Arc<EntityLocks> {
        &self.locks
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<TransactionRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Open a transaction on `entity_id`, taking its exclusive lock.
    ///
    /// A contended lock blocks; the wait counts against the transaction
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Draining` if the registry is shutting down,
    /// `SagaError::LockTimeout` if the lock stays held past the timeout,
    /// or `SagaError::Core` if no id can be generated. In every error case
    /// no transaction exists.
    pub async fn begin(
        &self,
        label: impl Into<String>,
        entity_id: &str,
    ) -> Result<SagaTransaction, SagaError> {
        if self.registry.is_draining() {
            return Err(SagaError::Draining);
        }
        let started = Instant::now();
        let lock = self
            .locks
            .acquire(entity_id, self.options.transaction_timeout)
            .await?;
        let record = Transaction::new(generate_id(PREFIX_TRANSACTION)?, label, entity_id);
        tracing::info!(transaction_id = %record.id, label = %record.label, entity_id, "transaction opened");
        self.publish(&record);

        Ok(SagaTransaction {
            record,
            actions: Vec::new(),
            deadline: started
                .checked_add(self.options.transaction_timeout)
                .unwrap_or_else(|| started + Duration::from_secs(365 * 24 * 3600)),
            _lock: lock,
        })
    }

    /// Abandon a transaction before it runs. Nothing was written, so it
    /// ends rolled back.
    pub fn cancel(&self, tx: SagaTransaction) -> Transaction {
        let SagaTransaction { mut record, .. } = tx;
        record.error = Some("cancelled before run".into());
        self.transition(&mut record, TransactionState::RolledBack);
        tracing::info!(transaction_id = %record.id, "transaction cancelled");
        record
    }

    /// Execute every step, compensating on failure. Always returns a
    /// terminal transaction; the entity lock is released on return.
    pub async fn run(&self, tx: SagaTransaction) -> Transaction {
        let SagaTransaction {
            mut record,
            actions,
            deadline,
            _lock: lock,
        } = tx;

        self.transition(&mut record, TransactionState::InProgress);

        let failure = self.forward(&mut record, &actions, deadline).await;

        match failure {
            None => {
                self.transition(&mut record, TransactionState::Committed);
                tracing::info!(transaction_id = %record.id, steps = record.steps.len(), "transaction committed");
            }
            Some(reason) => {
                tracing::warn!(transaction_id = %record.id, reason = %reason, "transaction failed, compensating");
                self.transition(&mut record, TransactionState::Compensating);
                self.compensate(&mut record, &actions).await;

                let residual: Vec<String> = record
                    .residual_steps()
                    .iter()
                    .map(|step| format!("{}#{} {} {}", step.backend, step.index, step.operation, step.record_id))
                    .collect();
                if residual.is_empty() {
                    record.error = Some(reason);
                    self.transition(&mut record, TransactionState::RolledBack);
                    tracing::info!(transaction_id = %record.id, "transaction rolled back");
                } else {
                    record.error = Some(format!(
                        "{reason}; compensation incomplete, residual steps: {}",
                        residual.join(", ")
                    ));
                    self.transition(&mut record, TransactionState::Failed);
                    tracing::warn!(
                        transaction_id = %record.id,
                        residual = residual.len(),
                        "transaction failed with residual writes"
                    );
                }
            }
        }

        drop(lock);
        record
    }

    /// Forward pass. Returns the failure reason, if any.
    async fn forward(
        &self,
        record: &mut Transaction,
        actions: &[Box<dyn StepAction>],
        deadline: Instant,
    ) -> Option<String> {
        let budget_ms = self.options.transaction_timeout.as_millis();
        for (index, action) in actions.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Some(format!(
                    "transaction timed out after {budget_ms} ms before step {index}"
                ));
            }

            let label = format!("{}.{}", record.steps[index].backend, record.steps[index].operation);
            let attempts = AtomicU32::new(0);
            let outcome = tokio::time::timeout(
                remaining,
                self.options.retry.run(&label, || {
                    attempts.fetch_add(1, Ordering::Relaxed);
                    action.forward()
                }),
            )
            .await;

            let step = &mut record.steps[index];
            step.attempts = attempts.load(Ordering::Relaxed);
            let failure = match outcome {
                Ok(Ok(result)) => {
                    log_violation(&record.id, step.mark_executed(result));
                    tracing::debug!(
                        transaction_id = %record.id,
                        step = index,
                        backend = %step.backend,
                        attempts = step.attempts,
                        "step executed"
                    );
                    None
                }
                Ok(Err(e)) => {
                    let message = e.to_string();
                    log_violation(&record.id, step.mark_failed(message.clone()));
                    Some(format!("step {index} ({label}) failed: {message}"))
                }
                Err(_) => {
                    let message = format!("timed out after {budget_ms} ms transaction budget");
                    log_violation(&record.id, step.mark_in_doubt(message.clone()));
                    Some(format!("step {index} ({label}) {message}"))
                }
            };

            self.publish(record);
            if failure.is_some() {
                return failure;
            }
        }
        None
    }

    /// Undo executed steps in reverse order, recording compensator failures.
    async fn compensate(&self, record: &mut Transaction, actions: &[Box<dyn StepAction>]) {
        let timeout = self.options.compensation_timeout;
        for index in (0..record.steps.len()).rev() {
            if !record.steps[index].needs_compensation() {
                continue;
            }
            let result = record.steps[index].result.clone().unwrap_or(Value::Null);
            let label = format!("{}.compensate", record.steps[index].backend);
            let action = &actions[index];

            let outcome = tokio::time::timeout(
                timeout,
                self.options.retry.run(&label, || action.compensate(&result)),
            )
            .await;

            let step = &mut record.steps[index];
            match outcome {
                Ok(Ok(())) => {
                    log_violation(&record.id, step.mark_compensated());
                    tracing::debug!(transaction_id = %record.id, step = index, "step compensated");
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        transaction_id = %record.id,
                        step = index,
                        backend = %step.backend,
                        error = %e,
                        "compensation failed"
                    );
                    step.record_compensation_failure(e.to_string());
                }
                Err(_) => {
                    tracing::warn!(
                        transaction_id = %record.id,
                        step = index,
                        backend = %step.backend,
                        "compensation timed out"
                    );
                    step.record_compensation_failure(format!(
                        "compensation timed out after {} ms",
                        timeout.as_millis()
                    ));
                }
            }
            self.publish(record);
        }
    }

    fn transition(&self, record: &mut Transaction, next: TransactionState) {
        let result = record.transition(next);
        log_violation(&record.id, result);
        self.publish(record);
    }

    fn publish(&self, record: &Transaction) {
        match self.registry.observe(record) {
            Ok(()) => {}
            Err(e @ SagaError::Journal(_)) => {
                tracing::error!(transaction_id = %record.id, error = %e, "transaction outcome not journaled");
            }
            Err(e) => {
                tracing::warn!(transaction_id = %record.id, error = %e, "registry did not accept event");
            }
        }
    }
}

/// Step and transaction transitions are driven from a fixed sequence here,
/// so a rejected transition is a coordinator bug. Log it loudly and carry on.
fn log_violation(transaction_id: &str, result: Result<(), CoreError>) {
    if let Err(e) = result {
        tracing::error!(transaction_id, error = %e, "state machine violation");
    }
}

//! Auto-fix engine: turns gaps into fix actions and carries them out.
//!
//! Every mutating fix runs as a saga transaction on the gap's record id, so
//! it holds the same per-entity lock as regular writes. Before a strategy
//! touches a derived record the engine snapshots it into the action; a fix
//! that fails in a way a retry cannot help is undone from that snapshot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use concord_config::ReconcileConfig;
use concord_core::entities::ProcessRecord;
use concord_core::enums::{FixStatus, FixStrategy, TransactionState};
use concord_core::ids::{PREFIX_RUN, generate_id};
use concord_core::reconcile::{BackupSnapshot, FixAction, FixConfigSnapshot, FixReport, Gap};
use concord_core::transaction::Transaction;
use concord_saga::{AdapterAction, SagaCoordinator, SagaTransaction};
use concord_store::{SharedAdapter, StoreError};

use crate::detector::GapDetector;
use crate::error::ReconcileError;
use crate::merge::merge_records;
use crate::strategy::{describe, select_strategy};

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Retries after the first attempt of a fix.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per retry.
    pub retry_delay: Duration,
    pub required_fields: Vec<String>,
    /// Where reports are written, if anywhere.
    pub report_dir: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&ReconcileConfig::default())
    }
}

impl From<&ReconcileConfig> for EngineOptions {
    fn from(config: &ReconcileConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            required_fields: config.required_fields.clone(),
            report_dir: config
                .persists_reports()
                .then(|| PathBuf::from(&config.report_dir)),
        }
    }
}

pub struct AutoFixEngine {
    coordinator: Arc<SagaCoordinator>,
    detector: GapDetector,
    options: EngineOptions,
}

/// How one attempt ended.
enum Attempt {
    Done,
    Retry(String),
    Fatal(String),
}

impl AutoFixEngine {
    #[must_use]
    pub fn new(
        coordinator: Arc<SagaCoordinator>,
        source: SharedAdapter,
        derived: Vec<SharedAdapter>,
        options: EngineOptions,
    ) -> Self {
        let detector = GapDetector::new(source, derived, options.required_fields.clone());
        Self {
            coordinator,
            detector,
            options,
        }
    }

    #[must_use]
    pub const fn detector(&self) -> &GapDetector {
        &self.detector
    }

    #[must_use]
    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Wrap a gap in a pending fix action with its selected strategy.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Core` if no action id can be generated.
    pub fn create_fix_action(&self, gap: Gap) -> Result<FixAction, ReconcileError> {
        let strategy = select_strategy(&gap);
        let description = describe(&gap, strategy);
        Ok(FixAction::new(gap, strategy, description)?)
    }

    /// Detect every gap and wrap each in a fix action.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Store` if detection cannot list a store.
    pub async fn plan(&self) -> Result<Vec<FixAction>, ReconcileError> {
        self.detector
            .detect_all()
            .await?
            .into_iter()
            .map(|gap| self.create_fix_action(gap))
            .collect()
    }

    /// Detect, plan, and execute in one call.
    ///
    /// # Errors
    ///
    /// Same as [`Self::plan`] and [`Self::execute`].
    pub async fn reconcile(
        &self,
        dry_run: bool,
        require_confirmation: bool,
    ) -> Result<FixReport, ReconcileError> {
        let actions = self.plan().await?;
        self.execute(actions, dry_run, require_confirmation).await
    }

    /// Execute `actions` in order and build the run's report.
    ///
    /// Individual fix failures end up in the report, never as an error.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Report` if the report cannot be persisted,
    /// or `ReconcileError::Core` if no run id can be generated.
    pub async fn execute(
        &self,
        mut actions: Vec<FixAction>,
        dry_run: bool,
        require_confirmation: bool,
    ) -> Result<FixReport, ReconcileError> {
        let run_id = generate_id(PREFIX_RUN)?;
        let started_at = Utc::now();
        tracing::info!(run_id = %run_id, actions = actions.len(), dry_run, "fix run started");

        for action in &mut actions {
            self.apply(action, dry_run, require_confirmation).await;
        }

        let config = FixConfigSnapshot {
            dry_run,
            require_confirmation,
            max_retries: self.options.max_retries,
            retry_delay_ms: u64::try_from(self.options.retry_delay.as_millis())
                .unwrap_or(u64::MAX),
            required_fields: self.options.required_fields.clone(),
        };
        let report = FixReport::build(run_id, actions, config, started_at);
        tracing::info!(
            run_id = %report.run_id,
            fixed = report.fixed,
            failed = report.failed,
            rolled_back = report.rolled_back,
            pending = report.pending,
            "fix run finished"
        );

        if let Some(dir) = &self.options.report_dir {
            std::fs::create_dir_all(dir)
                .map_err(|e| ReconcileError::Report(format!("{}: {e}", dir.display())))?;
            let path = dir.join(format!("fix-report-{}.json", report.run_id));
            report
                .write_json(&path)
                .map_err(|e| ReconcileError::Report(format!("{}: {e}", path.display())))?;
            tracing::debug!(path = %path.display(), "fix report written");
        }
        Ok(report)
    }

    async fn apply(&self, action: &mut FixAction, dry_run: bool, require_confirmation: bool) {
        if !ready(action, dry_run) {
            return;
        }
        if dry_run {
            action.note = Some(format!("dry run: would {}", action.description));
            if action.status == FixStatus::Pending {
                settle(action, FixStatus::Planned);
            }
            return;
        }
        if action.strategy == FixStrategy::Skip {
            action.note = Some(format!("no automatic fix for {}", action.gap.gap_type));
            settle(action, FixStatus::Skipped);
            return;
        }
        if require_confirmation && action.requires_confirmation && !action.confirmed {
            action.note = Some(format!("{} requires confirmation", action.strategy));
            tracing::info!(fix_id = %action.id, strategy = %action.strategy, "fix awaiting confirmation");
            return;
        }

        let mut delay = self.options.retry_delay;
        loop {
            action.attempts += 1;
            match self.attempt(action).await {
                Attempt::Done => {
                    action.error = None;
                    settle(action, FixStatus::Success);
                    return;
                }
                Attempt::Retry(reason) if action.attempts <= self.options.max_retries => {
                    tracing::warn!(
                        fix_id = %action.id,
                        attempt = action.attempts,
                        error = %reason,
                        "fix attempt failed, retrying"
                    );
                    action.error = Some(reason);
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Attempt::Retry(reason) => {
                    action.error = Some(format!(
                        "{reason} (gave up after {} attempts)",
                        action.attempts
                    ));
                    settle(action, FixStatus::Failed);
                    return;
                }
                Attempt::Fatal(reason) => {
                    action.error = Some(reason);
                    self.restore(action).await;
                    return;
                }
            }
        }
    }

    async fn attempt(&self, action: &mut FixAction) -> Attempt {
        let label = format!("fix_{}", action.strategy);
        let mut tx = match self.coordinator.begin(label, &action.gap.record_id).await {
            Ok(tx) => tx,
            Err(e) if e.is_retryable() => return Attempt::Retry(e.to_string()),
            Err(e) => return Attempt::Fatal(e.to_string()),
        };
        action.transaction_ids.push(tx.id().to_string());

        if let Err(e) = self.prepare(action, &mut tx).await {
            self.coordinator.cancel(tx);
            return classify_error(&e);
        }

        let outcome = self.coordinator.run(tx).await;
        match outcome.state {
            TransactionState::Committed => Attempt::Done,
            TransactionState::RolledBack => Attempt::Retry(transaction_error(&outcome)),
            _ => Attempt::Fatal(transaction_error(&outcome)),
        }
    }

    /// Take the backup (once per action) and add the strategy's steps.
    async fn prepare(
        &self,
        action: &mut FixAction,
        tx: &mut SagaTransaction,
    ) -> Result<(), ReconcileError> {
        let target = self.target(&action.gap.backend)?;
        let id = action.gap.record_id.clone();

        if action.strategy.takes_backup() && action.backup.is_none() {
            let current = target.read(&id).await?;
            action.store_backup(BackupSnapshot::new(target.name(), &id, current));
        }

        match action.strategy {
            FixStrategy::CopyFromSource => {
                let record = self.source_record(&id).await?.with_embedding(None);
                tx.add_adapter_step(upsert(target, target.read(&id).await?.is_some(), record));
            }
            FixStrategy::DeleteFromTarget => {
                tx.add_adapter_step(AdapterAction::delete(Arc::clone(target), id));
            }
            FixStrategy::UpdateTarget => {
                let current = target.read(&id).await?;
                let embedding = current.as_ref().and_then(|r| r.embedding.clone());
                let record = self.source_record(&id).await?.with_embedding(embedding);
                tx.add_adapter_step(upsert(target, current.is_some(), record));
            }
            FixStrategy::MergeData => {
                let source = self.source_record(&id).await?;
                let derived = target.read(&id).await?.ok_or_else(|| StoreError::NotFound {
                    backend: target.name().to_string(),
                    id: id.clone(),
                })?;
                let merged = merge_records(&source, &derived);
                if !merged.same_content(&source) {
                    let for_source = merged.clone().with_embedding(source.embedding.clone());
                    tx.add_adapter_step(AdapterAction::update(
                        Arc::clone(self.detector.source()),
                        for_source,
                    ));
                }
                tx.add_adapter_step(AdapterAction::update(
                    Arc::clone(target),
                    merged.with_embedding(derived.embedding),
                ));
            }
            FixStrategy::Skip => {}
        }
        Ok(())
    }

    /// Put the backed-up derived record back after a fatal failure.
    async fn restore(&self, action: &mut FixAction) {
        let Some(backup) = action.backup.clone() else {
            tracing::warn!(fix_id = %action.id, "fix failed without a backup to restore");
            settle(action, FixStatus::Failed);
            return;
        };

        match self.restore_backup(&backup).await {
            Ok(tx) if tx.state == TransactionState::Committed => {
                action.transaction_ids.push(tx.id);
                action.note = Some(format!("restored {} in {}", backup.record_id, backup.backend));
                settle(action, FixStatus::RolledBack);
            }
            Ok(tx) => {
                let reason = transaction_error(&tx);
                action.transaction_ids.push(tx.id);
                action.note = Some(format!("restore failed: {reason}"));
                settle(action, FixStatus::Failed);
            }
            Err(e) => {
                action.note = Some(format!("restore failed: {e}"));
                settle(action, FixStatus::Failed);
            }
        }
    }

    async fn restore_backup(&self, backup: &BackupSnapshot) -> Result<Transaction, ReconcileError> {
        let target = self.target(&backup.backend)?;
        let mut tx = self.coordinator.begin("restore_backup", &backup.record_id).await?;
        let current = match target.read(&backup.record_id).await {
            Ok(current) => current,
            Err(e) => {
                self.coordinator.cancel(tx);
                return Err(e.into());
            }
        };
        match (&backup.record, current) {
            (Some(record), current) => {
                tx.add_adapter_step(upsert(target, current.is_some(), record.clone()));
            }
            (None, Some(_)) => {
                tx.add_adapter_step(AdapterAction::delete(Arc::clone(target), &backup.record_id));
            }
            (None, None) => {}
        }
        Ok(self.coordinator.run(tx).await)
    }

    fn target(&self, backend: &str) -> Result<&SharedAdapter, ReconcileError> {
        self.detector
            .backend(backend)
            .ok_or_else(|| ReconcileError::UnknownBackend(backend.to_string()))
    }

    async fn source_record(&self, id: &str) -> Result<ProcessRecord, ReconcileError> {
        let source = self.detector.source();
        source.read(id).await?.ok_or_else(|| {
            StoreError::NotFound {
                backend: source.name().to_string(),
                id: id.to_string(),
            }
            .into()
        })
    }
}

/// Whether `action` may be carried out. Only `pending` actions are; a
/// `planned` one is put back to `pending` for a real run. Anything already
/// settled is left untouched with a note.
fn ready(action: &mut FixAction, dry_run: bool) -> bool {
    match action.status {
        FixStatus::Pending => true,
        FixStatus::Planned if dry_run => true,
        FixStatus::Planned => {
            if let Err(e) = action.set_status(FixStatus::Pending) {
                tracing::error!(fix_id = %action.id, error = %e, "fix status change refused");
                return false;
            }
            action.note = None;
            true
        }
        status => {
            tracing::warn!(fix_id = %action.id, status = %status, "fix already settled, not executed");
            action.note = Some(format!("already {status}, not executed again"));
            false
        }
    }
}

fn settle(action: &mut FixAction, status: FixStatus) {
    if let Err(e) = action.set_status(status) {
        tracing::error!(fix_id = %action.id, error = %e, "fix status change refused");
        return;
    }
    tracing::info!(
        fix_id = %action.id,
        record_id = %action.gap.record_id,
        backend = %action.gap.backend,
        strategy = %action.strategy,
        status = %status,
        attempts = action.attempts,
        "fix settled"
    );
}

fn upsert(target: &SharedAdapter, exists: bool, record: ProcessRecord) -> AdapterAction {
    if exists {
        AdapterAction::update(Arc::clone(target), record)
    } else {
        AdapterAction::create(Arc::clone(target), record)
    }
}

fn classify_error(error: &ReconcileError) -> Attempt {
    let retryable = match error {
        ReconcileError::Saga(e) => e.is_retryable(),
        ReconcileError::Store(e) => e.is_transient(),
        _ => false,
    };
    if retryable {
        Attempt::Retry(error.to_string())
    } else {
        Attempt::Fatal(error.to_string())
    }
}

fn transaction_error(tx: &Transaction) -> String {
    tx.error
        .clone()
        .unwrap_or_else(|| format!("transaction {} ended {}", tx.id, tx.state))
}

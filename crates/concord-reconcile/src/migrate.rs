//! One-shot import of a legacy export into all three stores.

use std::sync::Arc;
use std::time::Instant;

use concord_core::entities::ProcessEntity;
use concord_core::enums::TransactionState;
use concord_core::errors::CoreError;
use concord_core::responses::MigrationSummary;
use concord_saga::{ProcessWriter, SagaError};
use concord_store::{JsonlSource, RecordFilter, RecordReader};

use crate::error::ReconcileError;

pub struct Migrator {
    writer: Arc<ProcessWriter>,
}

impl Migrator {
    #[must_use]
    pub const fn new(writer: Arc<ProcessWriter>) -> Self {
        Self { writer }
    }

    /// Import every legacy record the structured store does not hold yet.
    ///
    /// Each import is a regular three-step create transaction. Records that
    /// fail validation and transactions that do not commit are listed in
    /// the summary; the import carries on past them.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Store` if the export or the structured store
    /// cannot be read, or `ReconcileError::Saga` if a transaction cannot be
    /// opened at all (lock timeout, registry draining).
    pub async fn migrate(&self, legacy: &JsonlSource) -> Result<MigrationSummary, ReconcileError> {
        let started = Instant::now();
        let records = legacy.list(&RecordFilter::all()).await?;

        let mut summary = MigrationSummary {
            scanned: count(records.len() + legacy.rejected().len()),
            invalid: legacy.rejected().to_vec(),
            ..MigrationSummary::default()
        };

        for record in records {
            let id = record.id.clone();
            if self.writer.structured().read(&id).await?.is_some() {
                summary.already_present += 1;
                continue;
            }

            let embedding = record.embedding.clone();
            let entity = match ProcessEntity::try_from(record) {
                Ok(entity) => entity,
                Err(CoreError::Validation(reason)) => {
                    summary.invalid.push(format!("{id}: {reason}"));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match self.writer.create(&entity, embedding).await {
                Ok(tx) if tx.state == TransactionState::Committed => summary.imported += 1,
                Ok(tx) => {
                    tracing::warn!(record_id = %id, transaction_id = %tx.id, state = %tx.state, "import did not commit");
                    summary.failed.push(tx.outcome());
                }
                Err(SagaError::Validation(reason)) => {
                    summary.invalid.push(format!("{id}: {reason}"));
                }
                Err(e) => return Err(e.into()),
            }
        }

        summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            path = %legacy.path().display(),
            scanned = summary.scanned,
            imported = summary.imported,
            already_present = summary.already_present,
            invalid = summary.invalid.len(),
            failed = summary.failed.len(),
            "migration finished"
        );
        Ok(summary)
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

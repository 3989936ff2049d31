//! Reconciliation records: gaps, fix actions, backups, and the fix report.

use std::path::Path;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::ProcessRecord;
use crate::enums::{FixStatus, FixStrategy, GapType, Severity};
use crate::errors::CoreError;
use crate::ids::{PREFIX_FIX, PREFIX_GAP, generate_id};

/// A detected divergence between the source of truth and one derived store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Gap {
    pub id: String,
    #[serde(rename = "type")]
    pub gap_type: GapType,
    pub record_id: String,
    /// Name of the derived backend the gap was found in.
    pub backend: String,
    pub severity: Severity,
    pub auto_fixable: bool,
    pub detail: serde_json::Value,
    pub detected_at: DateTime<Utc>,
}

impl Gap {
    /// Build a gap with the type's default severity and fixability.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::IdGeneration` if no id can be generated.
    pub fn new(
        gap_type: GapType,
        record_id: impl Into<String>,
        backend: impl Into<String>,
        detail: serde_json::Value,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            id: generate_id(PREFIX_GAP)?,
            gap_type,
            record_id: record_id.into(),
            backend: backend.into(),
            severity: gap_type.default_severity(),
            auto_fixable: gap_type.is_auto_fixable(),
            detail,
            detected_at: Utc::now(),
        })
    }
}

/// Image of a derived record taken before a fix mutates it.
///
/// `record` is `None` when the derived store held nothing for the id.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BackupSnapshot {
    pub backend: String,
    pub record_id: String,
    pub record: Option<ProcessRecord>,
    pub taken_at: DateTime<Utc>,
}

impl BackupSnapshot {
    #[must_use]
    pub fn new(
        backend: impl Into<String>,
        record_id: impl Into<String>,
        record: Option<ProcessRecord>,
    ) -> Self {
        Self {
            backend: backend.into(),
            record_id: record_id.into(),
            record,
            taken_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn digest(&self) -> Option<String> {
        self.record.as_ref().map(ProcessRecord::content_hash)
    }
}

/// The repair planned or performed for exactly one gap.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FixAction {
    pub id: String,
    pub gap: Gap,
    pub strategy: FixStrategy,
    pub description: String,
    pub requires_confirmation: bool,
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupSnapshot>,
    /// Content hash of the released backup, kept for the audit trail.
    pub backup_digest: Option<String>,
    pub status: FixStatus,
    pub attempts: u32,
    pub transaction_ids: Vec<String>,
    pub note: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl FixAction {
    /// # Errors
    ///
    /// Returns `CoreError::IdGeneration` if no id can be generated.
    pub fn new(
        gap: Gap,
        strategy: FixStrategy,
        description: impl Into<String>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            id: generate_id(PREFIX_FIX)?,
            gap,
            strategy,
            description: description.into(),
            requires_confirmation: strategy.requires_confirmation(),
            confirmed: false,
            backup: None,
            backup_digest: None,
            status: FixStatus::Pending,
            attempts: 0,
            transaction_ids: Vec::new(),
            note: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        })
    }

    /// Operator approval for a strategy that needs it.
    pub const fn confirm(&mut self) {
        self.confirmed = true;
    }

    /// Move to `next`. Terminal statuses release the backup snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` if the status machine does not
    /// allow the move.
    pub fn set_status(&mut self, next: FixStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity_type: "fix_action".into(),
                id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
            self.release_backup();
        }
        Ok(())
    }

    /// Move the snapshot into the action.
    pub fn store_backup(&mut self, snapshot: BackupSnapshot) {
        self.backup_digest = snapshot.digest();
        self.backup = Some(snapshot);
    }

    /// Drop the snapshot, keeping only its digest.
    pub fn release_backup(&mut self) -> Option<BackupSnapshot> {
        self.backup.take()
    }
}

/// Engine settings in force for one run, copied into the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FixConfigSnapshot {
    pub dry_run: bool,
    pub require_confirmation: bool,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub required_fields: Vec<String>,
}

/// Outcome of one reconciliation run. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FixReport {
    pub run_id: String,
    pub dry_run: bool,
    pub total: u32,
    pub auto_fixable: u32,
    pub fixed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub rolled_back: u32,
    pub pending: u32,
    pub planned: u32,
    pub actions: Vec<FixAction>,
    pub config: FixConfigSnapshot,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl FixReport {
    /// Aggregate counts over `actions`.
    #[must_use]
    pub fn build(
        run_id: impl Into<String>,
        actions: Vec<FixAction>,
        config: FixConfigSnapshot,
        started_at: DateTime<Utc>,
    ) -> Self {
        let count = |status: FixStatus| -> u32 {
            u32::try_from(actions.iter().filter(|a| a.status == status).count())
                .unwrap_or(u32::MAX)
        };
        let finished_at = Utc::now();
        let duration_ms = u64::try_from((finished_at - started_at).num_milliseconds()).unwrap_or(0);

        Self {
            run_id: run_id.into(),
            dry_run: config.dry_run,
            total: u32::try_from(actions.len()).unwrap_or(u32::MAX),
            auto_fixable: u32::try_from(actions.iter().filter(|a| a.gap.auto_fixable).count())
                .unwrap_or(u32::MAX),
            fixed: count(FixStatus::Success),
            failed: count(FixStatus::Failed),
            skipped: count(FixStatus::Skipped),
            rolled_back: count(FixStatus::RolledBack),
            pending: count(FixStatus::Pending),
            planned: count(FixStatus::Planned),
            actions,
            config,
            started_at,
            finished_at,
            duration_ms,
        }
    }

    /// Persist the report as pretty JSON for audit storage.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Other` on serialization or I/O failure.
    pub fn write_json(&self, path: &Path) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(self).map_err(anyhow::Error::from)?;
        std::fs::write(path, json).map_err(anyhow::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gap(gap_type: GapType) -> Gap {
        Gap::new(gap_type, "p1", "graph", json!({})).unwrap()
    }

    #[test]
    fn gap_takes_type_defaults() {
        let gap = gap(GapType::SchemaMismatch);
        assert_eq!(gap.severity, Severity::Critical);
        assert!(!gap.auto_fixable);
        assert!(gap.id.starts_with("gap-"));
    }

    #[test]
    fn gap_serializes_type_field() {
        let value = serde_json::to_value(gap(GapType::MissingRecord)).unwrap();
        assert_eq!(value["type"], json!("missing_record"));
    }

    #[test]
    fn terminal_status_releases_backup() {
        let mut action =
            FixAction::new(gap(GapType::OrphanedRecord), FixStrategy::DeleteFromTarget, "drop").unwrap();
        action.store_backup(BackupSnapshot::new("graph", "p1", None));
        assert!(action.backup.is_some());
        action.set_status(FixStatus::Success).unwrap();
        assert!(action.backup.is_none());
        assert!(action.finished_at.is_some());
    }

    #[test]
    fn exactly_one_terminal_status() {
        let mut action =
            FixAction::new(gap(GapType::MissingRecord), FixStrategy::CopyFromSource, "copy").unwrap();
        action.set_status(FixStatus::Failed).unwrap();
        assert!(action.set_status(FixStatus::Success).is_err());
    }

    #[test]
    fn planned_action_returns_to_pending_only() {
        let mut action =
            FixAction::new(gap(GapType::MissingRecord), FixStrategy::CopyFromSource, "copy").unwrap();
        action.set_status(FixStatus::Planned).unwrap();
        assert!(action.set_status(FixStatus::Success).is_err());
        action.set_status(FixStatus::Pending).unwrap();
        action.set_status(FixStatus::Success).unwrap();
        assert_eq!(action.status, FixStatus::Success);
    }

    #[test]
    fn report_counts_by_status() {
        let mut done =
            FixAction::new(gap(GapType::MissingRecord), FixStrategy::CopyFromSource, "copy").unwrap();
        done.set_status(FixStatus::Success).unwrap();
        let mut skipped = FixAction::new(gap(GapType::SchemaMismatch), FixStrategy::Skip, "skip").unwrap();
        skipped.set_status(FixStatus::Skipped).unwrap();
        let waiting =
            FixAction::new(gap(GapType::OrphanedRecord), FixStrategy::DeleteFromTarget, "drop").unwrap();

        let report = FixReport::build(
            "run-00000001",
            vec![done, skipped, waiting],
            FixConfigSnapshot::default(),
            Utc::now(),
        );
        assert_eq!(report.total, 3);
        assert_eq!(report.auto_fixable, 2);
        assert_eq!(report.fixed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.pending, 1);
        assert_eq!(report.failed, 0);
    }
}

//! Transaction registry with an append-only JSONL journal.
//!
//! The coordinator publishes every state change here. Live transactions are
//! kept in memory; terminal ones are archived, appended to the journal, and
//! never mutated again. On startup the journal is replayed so earlier
//! outcomes stay queryable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use concord_core::enums::TransactionState;
use concord_core::transaction::Transaction;

use crate::error::SagaError;

#[derive(Default)]
struct RegistryState {
    live: HashMap<String, Transaction>,
    archived: HashMap<String, Transaction>,
    draining: bool,
}

pub struct TransactionRegistry {
    state: Mutex<RegistryState>,
    journal: Option<PathBuf>,
}

impl TransactionRegistry {
    /// A registry without a journal (tests, dry runs).
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            journal: None,
        }
    }

    /// Open the registry, replaying archived transactions from `journal`.
    ///
    /// A missing journal file is created on the first archived transaction.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Registry` if the journal directory cannot be
    /// created or an existing journal cannot be parsed.
    pub fn open(journal: impl Into<PathBuf>) -> Result<Self, SagaError> {
        let journal = journal.into();
        if let Some(parent) = journal.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SagaError::Registry(format!("{}: {e}", parent.display())))?;
            }
        }

        let mut state = RegistryState::default();
        if journal.exists() {
            let entries: Vec<Transaction> = serde_jsonlines::json_lines(&journal)
                .map_err(|e| SagaError::Registry(format!("{}: {e}", journal.display())))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| SagaError::Registry(format!("{}: {e}", journal.display())))?;
            for tx in entries {
                if !tx.is_terminal() {
                    tracing::warn!(transaction_id = %tx.id, state = %tx.state, "journal entry is not terminal, skipping");
                    continue;
                }
                state.archived.insert(tx.id.clone(), tx);
            }
            tracing::info!(
                journal = %journal.display(),
                archived = state.archived.len(),
                "registry: replayed journal"
            );
        }

        Ok(Self {
            state: Mutex::new(state),
            journal: Some(journal),
        })
    }

    #[must_use]
    pub fn journal(&self) -> Option<&Path> {
        self.journal.as_deref()
    }

    /// Record a state change.
    ///
    /// # Errors
    ///
    /// Returns `SagaError::Draining` after [`Self::drain`], and
    /// `SagaError::Registry` when the event would mutate an archived
    /// transaction or move a live one backwards. A terminal transaction is
    /// archived in memory before the journal append; if that append fails
    /// the result is `SagaError::Journal`.
    pub fn observe(&self, tx: &Transaction) -> Result<(), SagaError> {
        let mut state = self.lock();
        if state.draining {
            tracing::warn!(transaction_id = %tx.id, state = %tx.state, "registry draining, event refused");
            return Err(SagaError::Draining);
        }
        if state.archived.contains_key(&tx.id) {
            tracing::error!(transaction_id = %tx.id, state = %tx.state, "attempt to mutate archived transaction");
            return Err(SagaError::Registry(format!(
                "transaction {} is archived and cannot change",
                tx.id
            )));
        }
        if let Some(previous) = state.live.get(&tx.id) {
            if previous.state != tx.state && !previous.state.can_transition_to(tx.state) {
                tracing::warn!(
                    transaction_id = %tx.id,
                    from = %previous.state,
                    to = %tx.state,
                    "non-monotonic transaction event"
                );
                return Err(SagaError::Registry(format!(
                    "transaction {} cannot move from {} to {}",
                    tx.id, previous.state, tx.state
                )));
            }
        }

        if tx.is_terminal() {
            state.live.remove(&tx.id);
            state.archived.insert(tx.id.clone(), tx.clone());
            drop(state);
            tracing::debug!(transaction_id = %tx.id, state = %tx.state, "registry: archived");
            if let Some(journal) = &self.journal {
                serde_jsonlines::append_json_lines(journal, [tx]).map_err(|e| {
                    tracing::error!(transaction_id = %tx.id, journal = %journal.display(), error = %e, "journal append failed");
                    SagaError::Journal(format!("{}: {e}", journal.display()))
                })?;
            }
        } else {
            state.live.insert(tx.id.clone(), tx.clone());
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Transaction> {
        let state = self.lock();
        state
            .live
            .get(id)
            .or_else(|| state.archived.get(id))
            .cloned()
    }

    /// Live and archived transactions, oldest first, optionally filtered by
    /// state.
    #[must_use]
    pub fn list(&self, filter: Option<TransactionState>) -> Vec<Transaction> {
        let state = self.lock();
        let mut all: Vec<Transaction> = state
            .live
            .values()
            .chain(state.archived.values())
            .filter(|tx| filter.is_none_or(|wanted| tx.state == wanted))
            .cloned()
            .collect();
        all.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Transactions that have not reached a terminal state.
    #[must_use]
    pub fn in_flight(&self) -> Vec<Transaction> {
        let state = self.lock();
        let mut live: Vec<Transaction> = state.live.values().cloned().collect();
        live.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        live
    }

    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.lock().draining
    }

    /// Stop accepting events. Returns the transactions still in flight.
    pub fn drain(&self) -> Vec<Transaction> {
        self.lock().draining = true;
        let in_flight = self.in_flight();
        if !in_flight.is_empty() {
            tracing::warn!(count = in_flight.len(), "registry drained with transactions in flight");
        }
        in_flight
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tx(id: &str) -> Transaction {
        Transaction::new(id, "create_process", "p1")
    }

    fn committed(id: &str) -> Transaction {
        let mut tx = tx(id);
        tx.transition(TransactionState::InProgress).unwrap();
        tx.transition(TransactionState::Committed).unwrap();
        tx
    }

    #[test]
    fn live_then_archived() {
        let registry = TransactionRegistry::in_memory();
        let mut t = tx("txn-00000001");
        registry.observe(&t).unwrap();
        assert_eq!(registry.in_flight().len(), 1);

        t.transition(TransactionState::InProgress).unwrap();
        registry.observe(&t).unwrap();
        t.transition(TransactionState::Committed).unwrap();
        registry.observe(&t).unwrap();

        assert!(registry.in_flight().is_empty());
        assert_eq!(
            registry.get("txn-00000001").map(|t| t.state),
            Some(TransactionState::Committed)
        );
    }

    #[test]
    fn archived_transaction_is_immutable() {
        let registry = TransactionRegistry::in_memory();
        let t = committed("txn-00000001");
        registry.observe(&t).unwrap();

        let mut tampered = t.clone();
        tampered.error = Some("rewritten".into());
        let err = registry.observe(&tampered).unwrap_err();
        assert!(matches!(err, SagaError::Registry(_)));
        assert_eq!(registry.get("txn-00000001").unwrap().error, None);
    }

    #[test]
    fn backwards_move_is_refused() {
        let registry = TransactionRegistry::in_memory();
        let mut t = tx("txn-00000001");
        t.transition(TransactionState::InProgress).unwrap();
        t.transition(TransactionState::Compensating).unwrap();
        registry.observe(&t).unwrap();

        let mut stale = tx("txn-00000001");
        stale.transition(TransactionState::InProgress).unwrap();
        assert!(registry.observe(&stale).is_err());
    }

    #[test]
    fn list_filters_by_state() {
        let registry = TransactionRegistry::in_memory();
        registry.observe(&committed("txn-00000001")).unwrap();
        registry.observe(&tx("txn-00000002")).unwrap();

        assert_eq!(registry.list(None).len(), 2);
        let pending = registry.list(Some(TransactionState::Pending));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "txn-00000002");
    }

    #[test]
    fn drain_refuses_events_and_reports_in_flight() {
        let registry = TransactionRegistry::in_memory();
        registry.observe(&tx("txn-00000001")).unwrap();
        let in_flight = registry.drain();
        assert_eq!(in_flight.len(), 1);
        assert!(registry.is_draining());
        assert!(matches!(
            registry.observe(&tx("txn-00000002")),
            Err(SagaError::Draining)
        ));
    }

    #[test]
    fn journal_failure_still_archives_outcome() {
        let dir = tempfile::TempDir::new().unwrap();
        let journal = dir.path().join("transactions.jsonl");
        let registry = TransactionRegistry::open(&journal).unwrap();
        // A directory where the journal file should be makes every append fail.
        std::fs::create_dir(&journal).unwrap();

        let mut t = tx("txn-00000001");
        t.transition(TransactionState::InProgress).unwrap();
        registry.observe(&t).unwrap();
        t.transition(TransactionState::Committed).unwrap();

        let err = registry.observe(&t).unwrap_err();
        assert!(matches!(err, SagaError::Journal(_)));
        assert_eq!(
            registry.get("txn-00000001").map(|t| t.state),
            Some(TransactionState::Committed)
        );
        assert!(registry.in_flight().is_empty());
        assert!(registry.drain().is_empty());
    }

    #[test]
    fn journal_replays_archived_transactions() {
        let dir = tempfile::TempDir::new().unwrap();
        let journal = dir.path().join("nested").join("transactions.jsonl");

        {
            let registry = TransactionRegistry::open(&journal).unwrap();
            registry.observe(&committed("txn-00000001")).unwrap();
            registry.observe(&tx("txn-00000002")).unwrap();
        }

        let reopened = TransactionRegistry::open(&journal).unwrap();
        let all = reopened.list(None);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "txn-00000001");
        assert_eq!(all[0].state, TransactionState::Committed);

        let err = reopened.observe(&committed("txn-00000001")).unwrap_err();
        assert!(matches!(err, SagaError::Registry(_)));
    }
}

mod common;

use common::{engine_options, harness, harness_with, record};
use concord_core::enums::{FixStatus, FixStrategy, GapType, TransactionState};
use concord_core::reconcile::FixReport;
use concord_reconcile::EngineOptions;
use concord_store::{AdapterCall, BackendAdapter, RecordReader};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn version_conflict_merge_takes_source_scalars() {
    let h = harness();
    let newer = record("g1", "Fulfilment v2", 0);
    h.structured.put(newer.clone()).await;
    h.vector_inner.put(newer.clone()).await;
    h.graph_inner.put(record("g1", "Fulfilment", 6)).await;

    let actions = h.engine.plan().await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].strategy, FixStrategy::MergeData);

    let report = h.engine.execute(actions, false, false).await.unwrap();
    assert_eq!(report.fixed, 1);
    let action = &report.actions[0];
    assert_eq!(action.status, FixStatus::Success);
    assert_eq!(action.attempts, 1);

    let graph = h.graph_inner.read("g1").await.unwrap().unwrap();
    assert_eq!(graph.body["name"], json!("Fulfilment v2"));
    assert!(graph.same_content(&newer));

    // Merged body equals the source, so only the derived store is written.
    let tx = h.registry.get(&action.transaction_ids[0]).unwrap();
    assert_eq!(tx.state, TransactionState::Committed);
    assert_eq!(tx.steps.len(), 1);
    assert_eq!(tx.steps[0].backend, "graph");
}

#[tokio::test]
async fn newer_derived_record_is_merged_back_into_source() {
    let h = harness();
    let mut source = record("g1", "Fulfilment", 4);
    source.body.insert("metadata".into(), json!({"owner": "ana", "sla": "24h"}));
    let mut derived = record("g1", "Fulfilment (revised)", 0);
    derived.body.insert("metadata".into(), json!({"owner": "bo", "region": "eu"}));
    derived.embedding = Some(vec![0.5]);
    h.structured.put(source.clone()).await;
    h.vector_inner.put(source).await;
    h.graph_inner.put(derived).await;

    let report = h.engine.reconcile(false, false).await.unwrap();
    assert_eq!(report.fixed, 1);

    let structured = h.structured.read("g1").await.unwrap().unwrap();
    let graph = h.graph_inner.read("g1").await.unwrap().unwrap();
    assert!(structured.same_content(&graph));
    assert_eq!(structured.body["name"], json!("Fulfilment (revised)"));
    assert_eq!(
        structured.body["metadata"],
        json!({"owner": "bo", "sla": "24h", "region": "eu"})
    );
    assert_eq!(graph.embedding, Some(vec![0.5]));

    let tx = h.registry.get(&report.actions[0].transaction_ids[0]).unwrap();
    let backends: Vec<&str> = tx.steps.iter().map(|s| s.backend.as_str()).collect();
    assert_eq!(backends, vec!["structured", "graph"]);
}

#[tokio::test]
async fn dry_run_plans_without_mutating() {
    let h = harness();
    h.structured.put(record("p1", "Intake", 0)).await;
    h.vector_inner.put(record("p1", "Intake", 0)).await;
    h.graph_inner.put(record("orphan", "Gone", 3)).await;

    let report = h.engine.reconcile(true, false).await.unwrap();
    assert!(report.dry_run);
    assert_eq!(report.total, 2);
    assert_eq!(report.fixed, 0);
    assert_eq!(report.planned, 2);
    assert!(report.actions.iter().all(|a| a.status == FixStatus::Planned));
    assert!(report.actions.iter().all(|a| a.transaction_ids.is_empty()));

    assert!(!h.graph_inner.contains("p1").await);
    assert!(h.graph_inner.contains("orphan").await);
    assert!(h.registry.list(None).is_empty());
}

#[tokio::test]
async fn dry_run_plans_skipped_gaps_too() {
    let h = harness();
    let source = record("p1", "Intake", 0);
    h.structured.put(source.clone()).await;
    h.vector_inner.put(source.clone()).await;
    let mut broken = source;
    broken.body.insert("elements".into(), json!({"start": "task"}));
    h.graph_inner.put(broken).await;

    let report = h.engine.reconcile(true, false).await.unwrap();
    assert_eq!(report.planned, 1);
    assert_eq!(report.skipped, 0);
    let action = &report.actions[0];
    assert_eq!(action.strategy, FixStrategy::Skip);
    assert_eq!(action.status, FixStatus::Planned);
    assert!(action.note.as_deref().is_some_and(|n| n.starts_with("dry run: would leave p1")));
}

#[tokio::test]
async fn planned_actions_can_be_executed_for_real() {
    let h = harness();
    h.structured.put(record("p1", "Intake", 0)).await;
    h.vector_inner.put(record("p1", "Intake", 0)).await;

    let planned = h.engine.reconcile(true, false).await.unwrap();
    assert_eq!(planned.actions[0].status, FixStatus::Planned);
    assert!(!h.graph_inner.contains("p1").await);

    let report = h.engine.execute(planned.actions, false, false).await.unwrap();
    assert_eq!(report.fixed, 1);
    assert_eq!(report.planned, 0);
    let action = &report.actions[0];
    assert_eq!(action.status, FixStatus::Success);
    assert_eq!(action.note, None);
    assert!(h.graph_inner.contains("p1").await);
}

#[tokio::test]
async fn settled_actions_are_not_executed_again() {
    let h = harness();
    h.graph_inner.put(record("p9", "Stray", 1)).await;

    let first = h.engine.reconcile(false, false).await.unwrap();
    assert_eq!(first.fixed, 1);
    let runs = h.registry.list(None).len();
    // Someone recreates the orphan; replaying the old report must not touch it.
    h.graph_inner.put(record("p9", "Stray", 1)).await;

    let replay = h.engine.execute(first.actions, false, false).await.unwrap();
    assert_eq!(replay.fixed, 1);
    let action = &replay.actions[0];
    assert_eq!(action.status, FixStatus::Success);
    assert_eq!(action.attempts, 1);
    assert_eq!(action.note.as_deref(), Some("already success, not executed again"));
    assert_eq!(h.registry.list(None).len(), runs);
    assert!(h.graph_inner.contains("p9").await);
}

#[tokio::test]
async fn unconfirmed_actions_stay_pending() {
    let h = harness();
    h.structured.put(record("p1", "Intake", 0)).await;
    h.vector_inner.put(record("p1", "Intake", 0)).await;

    let report = h.engine.reconcile(false, true).await.unwrap();
    assert_eq!(report.pending, 1);
    assert_eq!(report.fixed, 0);
    let action = &report.actions[0];
    assert_eq!(action.status, FixStatus::Pending);
    assert_eq!(
        action.note.as_deref(),
        Some("copy_from_source requires confirmation")
    );
    assert!(!h.graph_inner.contains("p1").await);

    let mut actions = h.engine.plan().await.unwrap();
    for action in &mut actions {
        action.confirm();
    }
    let report = h.engine.execute(actions, false, true).await.unwrap();
    assert_eq!(report.fixed, 1);
    assert!(h.graph_inner.contains("p1").await);
}

#[tokio::test]
async fn update_target_needs_no_confirmation() {
    let h = harness();
    let full = record("p1", "Intake", 0);
    h.seed(&full).await;
    let mut partial = full.clone();
    partial.body.remove("connections");
    partial.embedding = Some(vec![0.9]);
    h.vector_inner.put(partial).await;

    let report = h.engine.reconcile(false, true).await.unwrap();
    assert_eq!(report.fixed, 1);
    let action = &report.actions[0];
    assert_eq!(action.gap.gap_type, GapType::IncompleteMigration);
    assert_eq!(action.strategy, FixStrategy::UpdateTarget);
    assert!(!action.requires_confirmation);
    assert!(action.backup.is_none());
    assert!(action.backup_digest.is_some());

    let vector = h.vector_inner.read("p1").await.unwrap().unwrap();
    assert!(vector.same_content(&full));
    assert_eq!(vector.embedding, Some(vec![0.9]));
}

#[tokio::test]
async fn orphans_are_deleted() {
    let h = harness();
    h.graph_inner.put(record("p9", "Stray", 1)).await;

    let report = h.engine.reconcile(false, false).await.unwrap();
    assert_eq!(report.fixed, 1);
    assert_eq!(report.actions[0].strategy, FixStrategy::DeleteFromTarget);
    assert!(!h.graph_inner.contains("p9").await);
}

#[tokio::test]
async fn rerun_after_fix_finds_nothing() {
    let h = harness();
    h.structured.put(record("p1", "Intake", 0)).await;
    h.structured.put(record("g1", "Fulfilment v2", 0)).await;
    h.graph_inner.put(record("g1", "Fulfilment", 5)).await;
    h.vector_inner.put(record("p7", "Stray", 5)).await;

    let first = h.engine.reconcile(false, false).await.unwrap();
    assert_eq!(first.failed, 0);
    assert_eq!(first.fixed, first.total);

    let second = h.engine.reconcile(false, false).await.unwrap();
    assert_eq!(second.total, 0);
}

#[tokio::test]
async fn schema_mismatch_is_skipped() {
    let h = harness();
    let source = record("p1", "Intake", 0);
    h.structured.put(source.clone()).await;
    h.vector_inner.put(source.clone()).await;
    let mut broken = source;
    broken.body.insert("elements".into(), json!({"start": "task"}));
    h.graph_inner.put(broken.clone()).await;

    let report = h.engine.reconcile(false, false).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.auto_fixable, 0);
    assert_eq!(report.actions[0].status, FixStatus::Skipped);
    assert!(report.actions[0].transaction_ids.is_empty());
    assert_eq!(h.graph_inner.read("p1").await.unwrap(), Some(broken));
}

#[tokio::test]
async fn retries_then_fails_on_rolled_back_fix() {
    let h = harness();
    h.structured.put(record("p1", "Intake", 0)).await;
    h.vector_inner.put(record("p1", "Intake", 0)).await;
    h.graph.fail_permanently(AdapterCall::Create, "read-only replica");

    let report = h.engine.reconcile(false, false).await.unwrap();
    assert_eq!(report.failed, 1);
    let action = &report.actions[0];
    assert_eq!(action.status, FixStatus::Failed);
    assert_eq!(action.attempts, 3);
    assert_eq!(action.transaction_ids.len(), 3);
    assert!(
        action
            .error
            .as_deref()
            .is_some_and(|e| e.contains("gave up after 3 attempts"))
    );
    for id in &action.transaction_ids {
        assert_eq!(
            h.registry.get(id).map(|t| t.state),
            Some(TransactionState::RolledBack)
        );
    }
}

#[tokio::test]
async fn transient_failure_is_retried_to_success() {
    let h = harness_with(EngineOptions {
        max_retries: 3,
        ..engine_options()
    });
    h.structured.put(record("p1", "Intake", 0)).await;
    h.vector_inner.put(record("p1", "Intake", 0)).await;
    // The coordinator retries each step twice; the third failure reaches
    // the engine, which opens a fresh transaction.
    h.graph.fail_transiently(AdapterCall::Create, 3);

    let report = h.engine.reconcile(false, false).await.unwrap();
    assert_eq!(report.fixed, 1);
    assert_eq!(report.actions[0].attempts, 2);
    assert!(h.graph_inner.contains("p1").await);
}

#[tokio::test]
async fn fatal_failure_restores_backup() {
    let h = harness();
    let full = record("p1", "Intake", 0);
    h.structured.put(full.clone()).await;
    h.vector_inner.put(full.clone()).await;
    let mut partial = full;
    partial.body.remove("elements");
    h.graph_inner.put(partial.clone()).await;

    let actions = h.engine.plan().await.unwrap();
    assert_eq!(actions[0].strategy, FixStrategy::UpdateTarget);
    // Source vanishes between planning and execution.
    h.structured.delete("p1").await.unwrap();

    let report = h.engine.execute(actions, false, false).await.unwrap();
    assert_eq!(report.rolled_back, 1);
    let action = &report.actions[0];
    assert_eq!(action.status, FixStatus::RolledBack);
    assert_eq!(action.attempts, 1);
    assert!(action.error.as_deref().is_some_and(|e| e.contains("not found")));
    assert_eq!(action.transaction_ids.len(), 2);
    assert!(action.backup.is_none());
    assert_eq!(action.backup_digest, Some(partial.content_hash()));

    let graph = h.graph_inner.read("p1").await.unwrap().unwrap();
    assert!(graph.same_content(&partial));
}

#[tokio::test]
async fn fatal_failure_without_backup_fails() {
    let h = harness();
    h.structured.put(record("p1", "Intake", 0)).await;
    h.vector_inner.put(record("p1", "Intake", 0)).await;
    let actions = h.engine.plan().await.unwrap();
    assert_eq!(actions[0].strategy, FixStrategy::CopyFromSource);
    h.structured.delete("p1").await.unwrap();

    let report = h.engine.execute(actions, false, false).await.unwrap();
    assert_eq!(report.failed, 1);
    assert!(report.actions[0].backup_digest.is_none());
    assert!(!h.graph_inner.contains("p1").await);
}

#[tokio::test]
async fn report_is_written_to_report_dir() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness_with(EngineOptions {
        report_dir: Some(dir.path().join("reports")),
        ..engine_options()
    });
    h.graph_inner.put(record("p9", "Stray", 1)).await;

    let report = h.engine.reconcile(false, false).await.unwrap();
    let path = dir
        .path()
        .join("reports")
        .join(format!("fix-report-{}.json", report.run_id));
    let stored: FixReport =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(stored, report);
    assert_eq!(stored.config.max_retries, 2);
}

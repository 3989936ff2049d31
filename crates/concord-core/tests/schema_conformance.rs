//! Serialized records must validate against their own generated JSON Schemas.

use chrono::Utc;
use schemars::schema_for;
use serde_json::{Map, json};

use concord_core::entities::{ProcessConnection, ProcessElement, ProcessEntity, ProcessPayload};
use concord_core::enums::{FixStrategy, GapType, StepOperation, TransactionState};
use concord_core::reconcile::{FixAction, FixConfigSnapshot, FixReport, Gap};
use concord_core::transaction::{SagaStep, Transaction};

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! assert_conforms {
    ($ty:ty, $value:expr) => {{
        let schema = serde_json::to_value(schema_for!($ty)).unwrap();
        let instance = serde_json::to_value(&$value).unwrap();
        let errors = validate_against_schema(&schema, &instance);
        assert!(
            errors.is_empty(),
            "Schema validation failed for {}: {:?}",
            stringify!($ty),
            errors
        );
    }};
}

fn sample_process() -> ProcessEntity {
    ProcessEntity::new(
        "abc-123",
        "logistics",
        ProcessPayload {
            name: "Pick and pack".into(),
            elements: vec![
                ProcessElement {
                    id: "pick".into(),
                    kind: "task".into(),
                    label: "Pick".into(),
                    properties: Map::new(),
                },
                ProcessElement {
                    id: "pack".into(),
                    kind: "task".into(),
                    label: "Pack".into(),
                    properties: Map::new(),
                },
            ],
            connections: vec![ProcessConnection {
                id: "flow-1".into(),
                source: "pick".into(),
                target: "pack".into(),
                relation: "sequence".into(),
            }],
            metadata: json!({"owner": "warehouse"}).as_object().cloned().unwrap(),
        },
    )
}

#[test]
fn process_entity_conforms() {
    assert_conforms!(ProcessEntity, sample_process());
}

#[test]
fn process_record_conforms() {
    let record = sample_process()
        .to_record()
        .unwrap()
        .with_embedding(Some(vec![0.25, -0.5]));
    assert_conforms!(concord_core::entities::ProcessRecord, record);
}

#[test]
fn transaction_conforms() {
    let mut tx = Transaction::new("txn-0a0b0c0d", "create_process", "abc-123");
    let mut step = SagaStep::new(0, "structured", StepOperation::Create, "abc-123");
    step.mark_executed(json!({"backend": "structured", "id": "abc-123"}))
        .unwrap();
    tx.steps.push(step);
    tx.transition(TransactionState::InProgress).unwrap();
    tx.transition(TransactionState::Committed).unwrap();
    assert_conforms!(Transaction, tx);
}

#[test]
fn fix_report_conforms() {
    let gap = Gap::new(
        GapType::VersionConflict,
        "g1",
        "graph",
        json!({"newer": "source"}),
    )
    .unwrap();
    let action = FixAction::new(gap, FixStrategy::MergeData, "merge g1 into graph").unwrap();
    let report = FixReport::build(
        "run-0a0b0c0d",
        vec![action],
        FixConfigSnapshot {
            dry_run: true,
            require_confirmation: false,
            max_retries: 2,
            retry_delay_ms: 50,
            required_fields: vec!["name".into()],
        },
        Utc::now(),
    );
    assert_conforms!(FixReport, report);
}

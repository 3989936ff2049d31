#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use concord_core::entities::{ProcessConnection, ProcessElement, ProcessEntity, ProcessPayload, ProcessRecord};
use concord_core::enums::BackendKind;
use concord_reconcile::{AutoFixEngine, EngineOptions};
use concord_saga::{CoordinatorOptions, ProcessWriter, SagaCoordinator, TransactionRegistry};
use concord_store::{FaultyStore, MemoryStore, RetryPolicy, SharedAdapter};
use serde_json::Map;

pub struct Harness {
    pub structured: Arc<MemoryStore>,
    pub graph: Arc<FaultyStore>,
    pub graph_inner: Arc<MemoryStore>,
    pub vector: Arc<FaultyStore>,
    pub vector_inner: Arc<MemoryStore>,
    pub registry: Arc<TransactionRegistry>,
    pub writer: Arc<ProcessWriter>,
    pub engine: AutoFixEngine,
}

pub fn engine_options() -> EngineOptions {
    EngineOptions {
        max_retries: 2,
        retry_delay: Duration::from_millis(1),
        ..EngineOptions::default()
    }
}

pub fn harness() -> Harness {
    harness_with(engine_options())
}

pub fn harness_with(engine_options: EngineOptions) -> Harness {
    let structured = Arc::new(MemoryStore::new("structured", BackendKind::Structured));
    let graph_inner = Arc::new(MemoryStore::new("graph", BackendKind::Graph));
    let vector_inner = Arc::new(MemoryStore::new("vector", BackendKind::Vector));
    let graph = Arc::new(FaultyStore::new(graph_inner.clone()));
    let vector = Arc::new(FaultyStore::new(vector_inner.clone()));

    let registry = Arc::new(TransactionRegistry::in_memory());
    let options = CoordinatorOptions {
        transaction_timeout: Duration::from_secs(5),
        compensation_timeout: Duration::from_secs(2),
        retry: RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        },
    };
    let coordinator = Arc::new(SagaCoordinator::new(registry.clone(), options));

    let structured_adapter: SharedAdapter = structured.clone();
    let graph_adapter: SharedAdapter = graph.clone();
    let vector_adapter: SharedAdapter = vector.clone();
    let writer = Arc::new(ProcessWriter::new(
        coordinator.clone(),
        structured_adapter.clone(),
        graph_adapter.clone(),
        vector_adapter.clone(),
    ));
    let engine = AutoFixEngine::new(
        coordinator,
        structured_adapter,
        vec![vector_adapter, graph_adapter],
        engine_options,
    );

    Harness {
        structured,
        graph,
        graph_inner,
        vector,
        vector_inner,
        registry,
        writer,
        engine,
    }
}

pub fn process(id: &str, name: &str) -> ProcessEntity {
    let element = |id: &str| ProcessElement {
        id: id.into(),
        kind: "task".into(),
        label: id.into(),
        properties: Map::new(),
    };
    ProcessEntity::new(
        id,
        "sales",
        ProcessPayload {
            name: name.into(),
            elements: vec![element("start"), element("end")],
            connections: vec![ProcessConnection {
                id: "c1".into(),
                source: "start".into(),
                target: "end".into(),
                relation: "sequence".into(),
            }],
            metadata: Map::new(),
        },
    )
}

/// A stored record `age_hours` old.
pub fn record(id: &str, name: &str, age_hours: i64) -> ProcessRecord {
    let mut record = process(id, name).to_record().unwrap();
    record.updated_at = Utc::now() - chrono::Duration::hours(age_hours);
    record
}

impl Harness {
    /// Put the same record in all three stores.
    pub async fn seed(&self, record: &ProcessRecord) {
        self.structured.put(record.clone()).await;
        self.graph_inner.put(record.clone()).await;
        self.vector_inner.put(record.clone()).await;
    }
}

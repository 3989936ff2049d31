use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use concord_config::ConcordConfig;
use concord_core::enums::BackendKind;
use concord_reconcile::{AutoFixEngine, EngineOptions};
use concord_saga::{CoordinatorOptions, ProcessWriter, SagaCoordinator, TransactionRegistry};
use concord_store::{HealthProbe, LibsqlStore, SharedAdapter};

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub config: ConcordConfig,
    pub structured: SharedAdapter,
    pub graph: SharedAdapter,
    pub vector: SharedAdapter,
    pub registry: Arc<TransactionRegistry>,
    pub writer: Arc<ProcessWriter>,
    pub engine: AutoFixEngine,
    pub probe: HealthProbe,
}

impl AppContext {
    /// Open the three stores and the transaction journal under the data
    /// directory, and wire the coordinator, writer, and engine on top.
    pub async fn init(config: ConcordConfig) -> anyhow::Result<Self> {
        let storage = &config.storage;
        std::fs::create_dir_all(&storage.data_dir).with_context(|| {
            format!("failed to create data directory {}", storage.data_dir)
        })?;

        let structured = open("structured", BackendKind::Structured, &storage.structured_path()).await?;
        let graph = open("graph", BackendKind::Graph, &storage.graph_path()).await?;
        let vector = open("vector", BackendKind::Vector, &storage.vector_path()).await?;

        let registry = Arc::new(
            TransactionRegistry::open(storage.journal_path())
                .context("failed to open transaction journal")?,
        );
        let coordinator = Arc::new(SagaCoordinator::new(
            Arc::clone(&registry),
            CoordinatorOptions::from(&config.coordinator),
        ));
        let writer = Arc::new(ProcessWriter::new(
            Arc::clone(&coordinator),
            Arc::clone(&structured),
            Arc::clone(&graph),
            Arc::clone(&vector),
        ));
        let engine = AutoFixEngine::new(
            coordinator,
            Arc::clone(&structured),
            vec![Arc::clone(&graph), Arc::clone(&vector)],
            EngineOptions::from(&config.reconcile),
        );
        let probe = HealthProbe::new(config.health.timeout());

        Ok(Self {
            config,
            structured,
            graph,
            vector,
            registry,
            writer,
            engine,
            probe,
        })
    }

    /// All backends, structured first.
    pub fn adapters(&self) -> Vec<SharedAdapter> {
        vec![
            Arc::clone(&self.structured),
            Arc::clone(&self.graph),
            Arc::clone(&self.vector),
        ]
    }

    /// Stop accepting transactions and report any left in flight.
    pub fn shutdown(&self) {
        for tx in self.registry.drain() {
            tracing::warn!(transaction_id = %tx.id, state = %tx.state, "transaction still in flight at shutdown");
        }
    }
}

async fn open(name: &str, kind: BackendKind, path: &Path) -> anyhow::Result<SharedAdapter> {
    let path_str = path.to_string_lossy();
    let store = LibsqlStore::open_local(name, kind, &path_str)
        .await
        .with_context(|| format!("failed to open {name} store at {}", path.display()))?;
    Ok(Arc::new(store))
}

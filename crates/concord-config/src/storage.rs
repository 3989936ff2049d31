//! Local store locations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_data_dir() -> String {
    ".concord".into()
}

fn default_structured_db() -> String {
    "structured.db".into()
}

fn default_graph_db() -> String {
    "graph.db".into()
}

fn default_vector_db() -> String {
    "vector.db".into()
}

fn default_journal() -> String {
    "transactions.jsonl".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the local stores and the transaction journal.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_structured_db")]
    pub structured_db: String,

    #[serde(default = "default_graph_db")]
    pub graph_db: String,

    #[serde(default = "default_vector_db")]
    pub vector_db: String,

    /// Transaction registry journal (JSONL).
    #[serde(default = "default_journal")]
    pub journal: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            structured_db: default_structured_db(),
            graph_db: default_graph_db(),
            vector_db: default_vector_db(),
            journal: default_journal(),
        }
    }
}

impl StorageConfig {
    fn resolve(&self, file: &str) -> PathBuf {
        PathBuf::from(&self.data_dir).join(file)
    }

    #[must_use]
    pub fn structured_path(&self) -> PathBuf {
        self.resolve(&self.structured_db)
    }

    #[must_use]
    pub fn graph_path(&self) -> PathBuf {
        self.resolve(&self.graph_db)
    }

    #[must_use]
    pub fn vector_path(&self) -> PathBuf {
        self.resolve(&self.vector_db)
    }

    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.resolve(&self.journal)
    }
}

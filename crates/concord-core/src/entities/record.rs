use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::hash::json_digest;

/// A process as persisted by a backend adapter.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProcessRecord {
    pub id: String,
    pub domain: String,
    /// Payload fields (`name`, `elements`, `connections`, `metadata`, ...).
    pub body: Map<String, Value>,
    /// Opaque vector supplied by the embedding pipeline. Only the vector
    /// store keeps it; it never takes part in content comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessRecord {
    /// Hash over `domain` and `body`.
    #[must_use]
    pub fn content_hash(&self) -> String {
        json_digest(&json!({ "domain": self.domain, "body": self.body }))
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Option<Vec<f32>>) -> Self {
        self.embedding = embedding;
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Whether both records carry the same content, ignoring timestamps and
    /// embeddings.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.domain == other.domain && self.body == other.body
    }
}

/// Reference returned by a backend after a successful write.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RecordRef {
    pub backend: String,
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::ProcessRecord;
use crate::errors::CoreError;

/// A process model: the logical entity kept consistent across all stores.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProcessEntity {
    pub id: String,
    pub domain: String,
    pub payload: ProcessPayload,
    pub updated_at: DateTime<Utc>,
}

/// Structured content of a process.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProcessPayload {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<ProcessElement>,
    #[serde(default)]
    pub connections: Vec<ProcessConnection>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A node of the process (task, event, gateway, ...).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProcessElement {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A directed relation between two elements.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProcessConnection {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub relation: String,
}

impl ProcessEntity {
    pub fn new(id: impl Into<String>, domain: impl Into<String>, payload: ProcessPayload) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            payload,
            updated_at: Utc::now(),
        }
    }

    /// Check the payload before any write is attempted.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` describing the first violated rule:
    /// blank id/domain/name, duplicate element or connection ids, or a
    /// connection endpoint that names no element.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.trim().is_empty() {
            return Err(CoreError::Validation("process id must not be empty".into()));
        }
        if self.id.chars().any(char::is_whitespace) {
            return Err(CoreError::Validation(format!(
                "process id '{}' must not contain whitespace",
                self.id
            )));
        }
        if self.domain.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "process {} has an empty domain",
                self.id
            )));
        }
        if self.payload.name.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "process {} has an empty name",
                self.id
            )));
        }

        let mut element_ids = HashSet::new();
        for element in &self.payload.elements {
            if element.id.is_empty() {
                return Err(CoreError::Validation(format!(
                    "process {} has an element without id",
                    self.id
                )));
            }
            if !element_ids.insert(element.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "process {} has duplicate element id '{}'",
                    self.id, element.id
                )));
            }
        }

        let mut connection_ids = HashSet::new();
        for connection in &self.payload.connections {
            if !connection_ids.insert(connection.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "process {} has duplicate connection id '{}'",
                    self.id, connection.id
                )));
            }
            for endpoint in [&connection.source, &connection.target] {
                if !element_ids.contains(endpoint.as_str()) {
                    return Err(CoreError::Validation(format!(
                        "connection '{}' references unknown element '{endpoint}'",
                        connection.id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Convert into the stored record form.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Other` if the payload cannot be encoded as a JSON
    /// object.
    pub fn to_record(&self) -> Result<ProcessRecord, CoreError> {
        let body = match serde_json::to_value(&self.payload).map_err(anyhow::Error::from)? {
            Value::Object(map) => map,
            other => {
                return Err(CoreError::Other(anyhow::anyhow!(
                    "payload encoded as {other}, expected an object"
                )));
            }
        };
        Ok(ProcessRecord {
            id: self.id.clone(),
            domain: self.domain.clone(),
            body,
            embedding: None,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<ProcessRecord> for ProcessEntity {
    type Error = CoreError;

    fn try_from(record: ProcessRecord) -> Result<Self, Self::Error> {
        let payload: ProcessPayload = serde_json::from_value(Value::Object(record.body))
            .map_err(|e| {
                CoreError::Validation(format!("record {} has a malformed payload: {e}", record.id))
            })?;
        let entity = Self {
            id: record.id,
            domain: record.domain,
            payload,
            updated_at: record.updated_at,
        };
        entity.validate()?;
        Ok(entity)
    }
}

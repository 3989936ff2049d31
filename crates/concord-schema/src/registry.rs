//! Central schema registry for all Concord records.
//!
//! The `SchemaRegistry` builds JSON Schemas from concord-core types at
//! construction time using [`schemars::schema_for!`] and validates values
//! with `jsonschema`.

use std::collections::HashMap;

use concord_core::entities::{ProcessEntity, ProcessRecord};
use concord_core::reconcile::{FixAction, FixReport, Gap};
use concord_core::responses::{BackendHealth, MigrationSummary, TransactionOutcome};
use concord_core::transaction::{SagaStep, Transaction};
use schemars::schema_for;

use crate::error::SchemaError;

pub struct SchemaRegistry {
    schemas: HashMap<&'static str, serde_json::Value>,
}

/// Insert a schema into the map, converting the `schemars` output to a
/// `serde_json::Value`.
macro_rules! register {
    ($map:expr, $name:expr, $ty:ty) => {
        $map.insert(
            $name,
            serde_json::to_value(schema_for!($ty))
                .map_err(|e| SchemaError::Generation(format!("{}: {e}", $name)))?,
        );
    };
}

impl SchemaRegistry {
    /// Build a registry holding every record, report, and response schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Generation` if a generated schema cannot be
    /// converted to JSON.
    pub fn new() -> Result<Self, SchemaError> {
        let mut schemas = HashMap::new();

        // Entity and stored form
        register!(schemas, "process_entity", ProcessEntity);
        register!(schemas, "process_record", ProcessRecord);

        // Saga records
        register!(schemas, "transaction", Transaction);
        register!(schemas, "saga_step", SagaStep);

        // Reconciliation records
        register!(schemas, "gap", Gap);
        register!(schemas, "fix_action", FixAction);
        register!(schemas, "fix_report", FixReport);

        // Responses
        register!(schemas, "transaction_outcome", TransactionOutcome);
        register!(schemas, "backend_health", BackendHealth);
        register!(schemas, "migration_summary", MigrationSummary);

        Ok(Self { schemas })
    }

    /// Get a schema by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.schemas.get(name)
    }

    /// Validate a JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the schema name is unknown, or
    /// `SchemaError::ValidationFailed` with every validator message.
    pub fn validate(&self, name: &str, instance: &serde_json::Value) -> Result<(), SchemaError> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let validator = jsonschema::validator_for(schema)
            .map_err(|e| SchemaError::Generation(format!("{e}")))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| format!("{e}"))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed { errors })
        }
    }

    /// Registered schema names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.schemas.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}

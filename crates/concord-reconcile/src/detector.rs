//! Gap detection: compares every derived store with the source of truth.
//!
//! Detection only reads, so it may overlap live transactions. A record
//! caught between two steps of a running transaction shows up as a gap and
//! disappears on the next scan once the transaction settles.

use std::collections::{BTreeMap, BTreeSet};

use concord_core::entities::ProcessRecord;
use concord_core::enums::GapType;
use concord_core::errors::CoreError;
use concord_core::reconcile::Gap;
use concord_store::{RecordFilter, SharedAdapter};
use serde_json::{Value, json};

use crate::error::ReconcileError;

pub struct GapDetector {
    source: SharedAdapter,
    derived: Vec<SharedAdapter>,
    required_fields: Vec<String>,
}

impl GapDetector {
    /// Derived stores are scanned in name order.
    #[must_use]
    pub fn new(
        source: SharedAdapter,
        mut derived: Vec<SharedAdapter>,
        required_fields: Vec<String>,
    ) -> Self {
        derived.sort_by(|a, b| a.name().cmp(b.name()));
        Self {
            source,
            derived,
            required_fields,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &SharedAdapter {
        &self.source
    }

    #[must_use]
    pub fn derived(&self) -> &[SharedAdapter] {
        &self.derived
    }

    /// Look up a derived store by name.
    #[must_use]
    pub fn backend(&self, name: &str) -> Option<&SharedAdapter> {
        self.derived.iter().find(|adapter| adapter.name() == name)
    }

    /// Scan every derived store. Gaps are ordered by backend, then id.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Store` if any store cannot be listed.
    pub async fn detect_all(&self) -> Result<Vec<Gap>, ReconcileError> {
        let source = index(self.source.list(&RecordFilter::all()).await?);
        let mut gaps = Vec::new();
        for adapter in &self.derived {
            gaps.extend(self.scan(&source, adapter).await?);
        }
        tracing::info!(gaps = gaps.len(), backends = self.derived.len(), "detection finished");
        Ok(gaps)
    }

    /// Scan one derived store.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::UnknownBackend` for an unmanaged name, or
    /// `ReconcileError::Store` on a failed listing.
    pub async fn detect_backend(&self, name: &str) -> Result<Vec<Gap>, ReconcileError> {
        let adapter = self
            .backend(name)
            .ok_or_else(|| ReconcileError::UnknownBackend(name.to_string()))?;
        let source = index(self.source.list(&RecordFilter::all()).await?);
        self.scan(&source, adapter).await
    }

    /// Check one record id in every derived store.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Store` if a read fails.
    pub async fn detect_record(&self, id: &str) -> Result<Vec<Gap>, ReconcileError> {
        let source = self.source.read(id).await?;
        let mut gaps = Vec::new();
        for adapter in &self.derived {
            let derived = adapter.read(id).await?;
            if let Some(gap) = classify(
                id,
                source.as_ref(),
                derived.as_ref(),
                adapter.name(),
                &self.required_fields,
            )? {
                gaps.push(gap);
            }
        }
        Ok(gaps)
    }

    async fn scan(
        &self,
        source: &BTreeMap<String, ProcessRecord>,
        adapter: &SharedAdapter,
    ) -> Result<Vec<Gap>, ReconcileError> {
        let derived = index(adapter.list(&RecordFilter::all()).await?);
        let ids: BTreeSet<&String> = source.keys().chain(derived.keys()).collect();

        let mut gaps = Vec::new();
        for id in ids {
            if let Some(gap) = classify(
                id,
                source.get(id),
                derived.get(id),
                adapter.name(),
                &self.required_fields,
            )? {
                gaps.push(gap);
            }
        }
        tracing::debug!(backend = %adapter.name(), gaps = gaps.len(), "backend scanned");
        Ok(gaps)
    }
}

fn index(records: Vec<ProcessRecord>) -> BTreeMap<String, ProcessRecord> {
    records
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect()
}

/// Classify one id in one derived store.
///
/// Checks run in a fixed order: presence, then required fields, then field
/// types, then domain, then content hash. Identical content is never a gap,
/// whatever the timestamps say.
///
/// # Errors
///
/// Returns `CoreError::IdGeneration` if the gap id cannot be generated.
pub fn classify(
    id: &str,
    source: Option<&ProcessRecord>,
    derived: Option<&ProcessRecord>,
    backend: &str,
    required_fields: &[String],
) -> Result<Option<Gap>, CoreError> {
    let (gap_type, detail) = match (source, derived) {
        (None, None) => return Ok(None),
        (Some(source), None) => (
            GapType::MissingRecord,
            json!({ "source_hash": source.content_hash() }),
        ),
        (None, Some(derived)) => (
            GapType::OrphanedRecord,
            json!({ "derived_hash": derived.content_hash() }),
        ),
        (Some(source), Some(derived)) => match compare(source, derived, required_fields) {
            Some(found) => found,
            None => return Ok(None),
        },
    };
    Gap::new(gap_type, id, backend, detail).map(Some)
}

fn compare(
    source: &ProcessRecord,
    derived: &ProcessRecord,
    required_fields: &[String],
) -> Option<(GapType, Value)> {
    let source_hash = source.content_hash();
    let derived_hash = derived.content_hash();
    if source_hash == derived_hash {
        return None;
    }

    let missing: Vec<&str> = required_fields
        .iter()
        .filter(|field| source.body.contains_key(*field) && !derived.body.contains_key(*field))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Some((
            GapType::IncompleteMigration,
            json!({ "missing_fields": missing }),
        ));
    }

    let mismatched: Vec<Value> = source
        .body
        .iter()
        .filter_map(|(field, value)| {
            let other = derived.body.get(field)?;
            (kind(value) != kind(other)).then(|| {
                json!({
                    "field": field,
                    "source_kind": kind(value),
                    "derived_kind": kind(other),
                })
            })
        })
        .collect();
    if !mismatched.is_empty() {
        return Some((
            GapType::SchemaMismatch,
            json!({ "reason": "incompatible_types", "fields": mismatched }),
        ));
    }

    if source.domain != derived.domain {
        return Some((
            GapType::SchemaMismatch,
            json!({
                "reason": "ambiguous",
                "source_domain": source.domain,
                "derived_domain": derived.domain,
            }),
        ));
    }

    let newer = if derived.updated_at > source.updated_at {
        "derived"
    } else {
        "source"
    };
    Some((
        GapType::VersionConflict,
        json!({
            "source_hash": source_hash,
            "derived_hash": derived_hash,
            "source_updated_at": source.updated_at,
            "derived_updated_at": derived.updated_at,
            "newer": newer,
        }),
    ))
}

/// JSON kind name. Integers and floats are both `number`.
const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

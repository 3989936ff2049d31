//! Merge policy for version conflicts.
//!
//! The side with the later `updated_at` wins every top-level field whose
//! value is not an object. Object fields (such as `metadata`) are unioned by
//! key with the later side winning per key. A timestamp tie counts the
//! source as the later write. Fields present on only one side are kept.

use concord_core::entities::ProcessRecord;
use serde_json::{Map, Value};

/// Merge `source` and `derived` into one record.
///
/// Identity (`id`, `domain`) always comes from the source. The embedding is
/// left unset; callers attach the one their target store keeps.
#[must_use]
pub fn merge_records(source: &ProcessRecord, derived: &ProcessRecord) -> ProcessRecord {
    let source_wins = source.updated_at >= derived.updated_at;
    let (newer, older) = if source_wins {
        (source, derived)
    } else {
        (derived, source)
    };

    ProcessRecord {
        id: source.id.clone(),
        domain: source.domain.clone(),
        body: merge_maps(&newer.body, &older.body),
        embedding: None,
        updated_at: newer.updated_at,
    }
}

fn merge_maps(newer: &Map<String, Value>, older: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = older.clone();
    for (key, value) in newer {
        let combined = match (value, older.get(key)) {
            (Value::Object(new_fields), Some(Value::Object(old_fields))) => {
                let mut fields = old_fields.clone();
                fields.extend(new_fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                Value::Object(fields)
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(body: Value, age_hours: i64) -> ProcessRecord {
        let Value::Object(body) = body else {
            panic!("body must be an object");
        };
        ProcessRecord {
            id: "g1".into(),
            domain: "ops".into(),
            body,
            embedding: None,
            updated_at: Utc::now() - Duration::hours(age_hours),
        }
    }

    #[test]
    fn newer_source_wins_scalars() {
        let source = record(json!({"name": "Fulfilment v2", "elements": [1, 2]}), 0);
        let derived = record(json!({"name": "Fulfilment", "elements": [1]}), 5);
        let merged = merge_records(&source, &derived);
        assert_eq!(merged.body, source.body);
        assert_eq!(merged.updated_at, source.updated_at);
    }

    #[test]
    fn newer_derived_wins_scalars_but_keeps_source_identity() {
        let source = record(json!({"name": "Old"}), 5);
        let mut derived = record(json!({"name": "New"}), 0);
        derived.domain = "hr".into();
        let merged = merge_records(&source, &derived);
        assert_eq!(merged.body["name"], json!("New"));
        assert_eq!(merged.domain, "ops");
        assert_eq!(merged.updated_at, derived.updated_at);
    }

    #[test]
    fn metadata_is_unioned_with_newer_keys_winning() {
        let source = record(
            json!({"metadata": {"owner": "ana", "sla": "24h"}}),
            0,
        );
        let derived = record(
            json!({"metadata": {"owner": "bo", "region": "eu"}}),
            2,
        );
        let merged = merge_records(&source, &derived);
        assert_eq!(
            merged.body["metadata"],
            json!({"owner": "ana", "sla": "24h", "region": "eu"})
        );
    }

    #[test]
    fn tie_goes_to_source() {
        let source = record(json!({"name": "A"}), 1);
        let mut derived = record(json!({"name": "B"}), 1);
        derived.updated_at = source.updated_at;
        assert_eq!(merge_records(&source, &derived).body["name"], json!("A"));
    }

    #[test]
    fn one_sided_fields_survive() {
        let source = record(json!({"name": "A"}), 0);
        let derived = record(json!({"name": "B", "legacy_code": 7}), 1);
        let merged = merge_records(&source, &derived);
        assert_eq!(merged.body["legacy_code"], json!(7));
    }

    #[test]
    fn merging_is_stable() {
        let source = record(json!({"name": "A", "metadata": {"k": 1}}), 0);
        let derived = record(json!({"name": "B", "metadata": {"j": 2}}), 1);
        let once = merge_records(&source, &derived);
        let twice = merge_records(&once, &once.clone());
        assert!(once.same_content(&twice));
    }
}

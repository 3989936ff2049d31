//! Row parsing helpers for the libSQL store.

use chrono::{DateTime, Utc};
use concord_core::entities::ProcessRecord;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Format a timestamp for storage. Fixed-width UTC so that TEXT comparison
/// in SQL orders the same way as the timestamps.
#[must_use]
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

/// Parse a TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s
/// default format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `StoreError::Query` if the string matches neither format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| StoreError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse the `body` column, which must hold a JSON object.
///
/// # Errors
///
/// Returns `StoreError::Query` for invalid JSON or a non-object value.
pub fn parse_body(s: &str) -> Result<Map<String, Value>, StoreError> {
    match serde_json::from_str(s)
        .map_err(|e| StoreError::Query(format!("Invalid JSON in body column: {e}")))?
    {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Query(format!(
            "body column holds {other}, expected an object"
        ))),
    }
}

/// Parse the nullable `embedding` column.
///
/// # Errors
///
/// Returns `StoreError::Query` if a non-empty value is not a JSON number array.
pub fn parse_embedding(s: Option<&str>) -> Result<Option<Vec<f32>>, StoreError> {
    match s {
        Some(s) if !s.is_empty() => serde_json::from_str(s)
            .map(Some)
            .map_err(|e| StoreError::Query(format!("Invalid embedding column: {e}"))),
        _ => Ok(None),
    }
}

/// Map a `SELECT id, domain, body, embedding, updated_at` row.
///
/// # Errors
///
/// Returns `StoreError` if a column is missing or malformed.
pub fn row_to_record(row: &libsql::Row) -> Result<ProcessRecord, StoreError> {
    let embedding = row.get::<Option<String>>(3)?;
    Ok(ProcessRecord {
        id: row.get::<String>(0)?,
        domain: row.get::<String>(1)?,
        body: parse_body(&row.get::<String>(2)?)?,
        embedding: parse_embedding(embedding.as_deref())?,
        updated_at: parse_datetime(&row.get::<String>(4)?)?,
    })
}

//! Legacy source-of-truth export read from a JSONL file.
//!
//! Each line is one `ProcessRecord`. Lines that do not parse are kept aside
//! with their line number so an import can report them instead of aborting.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use concord_core::entities::ProcessRecord;
use serde_json::Value;

use crate::adapter::{RecordFilter, RecordReader};
use crate::error::StoreError;

pub struct JsonlSource {
    path: PathBuf,
    records: Vec<ProcessRecord>,
    rejected: Vec<String>,
}

impl JsonlSource {
    /// Load the whole export.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Other` if the file cannot be opened or a line is
    /// not valid JSON. Lines that are JSON but not a record are rejected
    /// individually.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let lines: Vec<Value> = serde_jsonlines::json_lines(&path)
            .map_err(|e| StoreError::Other(e.into()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Other(e.into()))?;

        let mut records: Vec<ProcessRecord> = Vec::with_capacity(lines.len());
        let mut rejected = Vec::new();
        for (index, line) in lines.into_iter().enumerate() {
            match serde_json::from_value::<ProcessRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => rejected.push(format!("line {}: {e}", index + 1)),
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));

        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            rejected = rejected.len(),
            "legacy: loaded export"
        );
        Ok(Self {
            path,
            records,
            rejected,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines that could not be read as records.
    #[must_use]
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordReader for JsonlSource {
    async fn read(&self, id: &str) -> Result<Option<ProcessRecord>, StoreError> {
        Ok(self
            .records
            .binary_search_by(|record| record.id.as_str().cmp(id))
            .ok()
            .map(|index| self.records[index].clone()))
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ProcessRecord>, StoreError> {
        let matching = self.records.iter().filter(|record| filter.matches(record));
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_records_and_rejects_malformed_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"id":"p2","domain":"ops","body":{{"name":"B"}},"updated_at":"2025-01-01T00:00:00Z"}}"#
        )
        .unwrap();
        writeln!(file, r#"{{"id":"broken"}}"#).unwrap();
        writeln!(
            file,
            r#"{{"id":"p1","domain":"ops","body":{{"name":"A"}},"updated_at":"2025-01-01T00:00:00Z"}}"#
        )
        .unwrap();

        let source = JsonlSource::load(file.path()).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.rejected().len(), 1);
        assert!(source.rejected()[0].starts_with("line 2:"));

        let ids: Vec<String> = source
            .list(&RecordFilter::all())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert!(source.read("p2").await.unwrap().is_some());
        assert!(source.read("p9").await.unwrap().is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(JsonlSource::load("/nonexistent/export.jsonl").is_err());
    }
}

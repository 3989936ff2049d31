//! libSQL-backed adapter.
//!
//! One local database file (or `:memory:`) per backend, with the
//! `process_records` table created by an embedded, idempotent migration.

use async_trait::async_trait;
use concord_core::entities::{ProcessRecord, RecordRef};
use concord_core::enums::BackendKind;
use libsql::Builder;

use crate::adapter::{BackendAdapter, RecordFilter, RecordReader, record_ref};
use crate::error::StoreError;
use crate::helpers::{format_datetime, row_to_record};

const MIGRATION_001: &str = include_str!("../migrations/001_process_records.sql");

const SELECT_COLUMNS: &str = "SELECT id, domain, body, embedding, updated_at FROM process_records";

pub struct LibsqlStore {
    name: String,
    kind: BackendKind,
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl LibsqlStore {
    /// Open (or create) a local database and run migrations.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the database cannot be opened or the
    /// migration fails.
    pub async fn open_local(
        name: impl Into<String>,
        kind: BackendKind,
        path: &str,
    ) -> Result<Self, StoreError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        let store = Self {
            name: name.into(),
            kind,
            db,
            conn,
        };
        store.run_migrations().await?;
        tracing::debug!(backend = %store.name, path, "libsql: opened");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| StoreError::Migration(format!("001_process_records: {e}")))?;
        Ok(())
    }

    fn encode(record: &ProcessRecord) -> Result<(String, Option<String>), StoreError> {
        let body = serde_json::to_string(&record.body)?;
        let embedding = record
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        Ok((body, embedding))
    }
}

#[async_trait]
impl RecordReader for LibsqlStore {
    async fn read(&self, id: &str) -> Result<Option<ProcessRecord>, StoreError> {
        let mut rows = self
            .conn
            .query(&format!("{SELECT_COLUMNS} WHERE id = ?1"), [id])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ProcessRecord>, StoreError> {
        let mut clauses = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();
        let mut idx = 1;

        if let Some(domain) = &filter.domain {
            clauses.push(format!("domain = ?{idx}"));
            params.push(domain.as_str().into());
            idx += 1;
        }
        if let Some(since) = filter.updated_since {
            clauses.push(format!("updated_at >= ?{idx}"));
            params.push(format_datetime(&since).into());
        }

        let mut sql = SELECT_COLUMNS.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut rows = self
            .conn
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl BackendAdapter for LibsqlStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn create(&self, record: &ProcessRecord) -> Result<RecordRef, StoreError> {
        let (body, embedding) = Self::encode(record)?;
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO process_records (id, domain, body, embedding, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                libsql::params![
                    record.id.as_str(),
                    record.domain.as_str(),
                    body,
                    embedding,
                    format_datetime(&record.updated_at)
                ],
            )
            .await?;
        if inserted == 0 {
            return Err(StoreError::already_exists(&self.name, &record.id));
        }
        tracing::debug!(backend = %self.name, record_id = %record.id, "libsql: created");
        Ok(record_ref(&self.name, record))
    }

    async fn update(&self, record: &ProcessRecord) -> Result<RecordRef, StoreError> {
        let (body, embedding) = Self::encode(record)?;
        let changed = self
            .conn
            .execute(
                "UPDATE process_records SET domain = ?2, body = ?3, embedding = ?4, updated_at = ?5
                 WHERE id = ?1",
                libsql::params![
                    record.id.as_str(),
                    record.domain.as_str(),
                    body,
                    embedding,
                    format_datetime(&record.updated_at)
                ],
            )
            .await?;
        if changed == 0 {
            return Err(StoreError::not_found(&self.name, &record.id));
        }
        tracing::debug!(backend = %self.name, record_id = %record.id, "libsql: updated");
        Ok(record_ref(&self.name, record))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM process_records WHERE id = ?1", [id])
            .await?;
        tracing::debug!(backend = %self.name, record_id = %id, removed, "libsql: deleted");
        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut rows = self.conn.query("SELECT 1", ()).await.map_err(|e| {
            StoreError::Unavailable {
                backend: self.name.clone(),
                reason: e.to_string(),
            }
        })?;
        rows.next().await?;
        Ok(())
    }
}

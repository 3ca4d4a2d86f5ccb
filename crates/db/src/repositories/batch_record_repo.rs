//! Repository for batch completion tables.
//!
//! The table name comes from each worker event, so every statement is
//! built at runtime from a validated [`TableName`].

use std::future::Future;

use burst_core::job::BatchCompletionRecord;
use chrono::{DateTime, Utc};

use crate::error::DbError;
use crate::models::batch_record::BatchRecordRow;
use crate::table::TableName;
use crate::DbPool;

/// Column list for batch completion queries.
const COLUMNS: &str = "job_id, batch_id, expires_at, attributes";

/// Metadata sink the worker reports completed batches to.
pub trait BatchRecordStore: Send + Sync {
    /// Insert or replace the record for `(job_id, batch_id)`.
    fn put_record(
        &self,
        table: &TableName,
        record: &BatchCompletionRecord,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Records for `job_id` that have not expired as of `now`.
    fn find_live(
        &self,
        table: &TableName,
        job_id: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<BatchCompletionRecord>, DbError>> + Send;
}

// ---------------------------------------------------------------------------
// SQL
// ---------------------------------------------------------------------------

pub fn create_table_sql(table: &TableName) -> String {
    let t = table.quoted();
    format!(
        "CREATE TABLE IF NOT EXISTS {t} ( \
            job_id TEXT NOT NULL, \
            batch_id BIGINT NOT NULL, \
            expires_at TIMESTAMPTZ NOT NULL, \
            attributes JSONB NOT NULL DEFAULT '{{}}'::jsonb, \
            PRIMARY KEY (job_id, batch_id))"
    )
}

pub fn upsert_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {} ({COLUMNS}) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (job_id, batch_id) DO UPDATE \
         SET expires_at = EXCLUDED.expires_at, attributes = EXCLUDED.attributes",
        table.quoted()
    )
}

pub fn find_live_sql(table: &TableName) -> String {
    format!(
        "SELECT {COLUMNS} FROM {} WHERE job_id = $1 AND expires_at > $2 ORDER BY batch_id",
        table.quoted()
    )
}

pub fn purge_expired_sql(table: &TableName) -> String {
    format!("DELETE FROM {} WHERE expires_at <= $1", table.quoted())
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

/// [`BatchRecordStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgBatchRecordStore {
    pool: DbPool,
}

impl PgBatchRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create `table` if it does not exist. The default table is created by
    /// the migrations; events may name others.
    pub async fn ensure_table(&self, table: &TableName) -> Result<(), DbError> {
        sqlx::query(&create_table_sql(table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete rows that expired at or before `now`. Returns the row count.
    pub async fn purge_expired(
        &self,
        table: &TableName,
        now: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let result = sqlx::query(&purge_expired_sql(table))
            .bind(now)
            .execute(&self.pool)
            .await?;
        let purged = result.rows_affected();
        tracing::info!(table = %table, purged, "Purged expired batch records");
        Ok(purged)
    }
}

impl BatchRecordStore for PgBatchRecordStore {
    async fn put_record(
        &self,
        table: &TableName,
        record: &BatchCompletionRecord,
    ) -> Result<(), DbError> {
        let row = BatchRecordRow::from_record(record)?;
        sqlx::query(&upsert_sql(table))
            .bind(&row.job_id)
            .bind(row.batch_id)
            .bind(row.expires_at)
            .bind(&row.attributes)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_live(
        &self,
        table: &TableName,
        job_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<BatchCompletionRecord>, DbError> {
        let rows = sqlx::query_as::<_, BatchRecordRow>(&find_live_sql(table))
            .bind(job_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(BatchRecordRow::into_record).collect())
    }
}

//! Batch completion record rows.

use burst_core::job::BatchCompletionRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::error::DbError;

/// A row from a batch completion table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BatchRecordRow {
    pub job_id: String,
    pub batch_id: i64,
    pub expires_at: DateTime<Utc>,
    pub attributes: serde_json::Value,
}

impl BatchRecordRow {
    pub fn from_record(record: &BatchCompletionRecord) -> Result<Self, DbError> {
        let batch_id = i64::try_from(record.batch_id)
            .map_err(|_| DbError::BatchIdOutOfRange(record.batch_id))?;
        Ok(Self {
            job_id: record.job_id.clone(),
            batch_id,
            expires_at: record.expiry_time,
            attributes: serde_json::Value::Object(record.result_attributes.clone()),
        })
    }

    /// Convert back to the domain record. Non-object attributes and
    /// negative batch ids are normalised rather than rejected.
    pub fn into_record(self) -> BatchCompletionRecord {
        let result_attributes = match self.attributes {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        BatchCompletionRecord {
            job_id: self.job_id,
            batch_id: u64::try_from(self.batch_id).unwrap_or_default(),
            expiry_time: self.expires_at,
            result_attributes,
        }
    }
}

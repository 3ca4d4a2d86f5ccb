//! In-memory and fault-injecting test doubles.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use burst_core::job::BatchCompletionRecord;
use burst_db::{BatchRecordStore, DbError, TableName};
use burst_storage::{ObjectStore, RetryPolicy, StorageError};
use burst_worker::{PipelineConfig, PipelineContext};
use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

/// Map-backed store that counts every call and can fail chosen keys.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    ops: AtomicUsize,
    gets: Mutex<HashMap<String, u32>>,
    /// Remaining forced failures per key for `get`.
    get_failures: Mutex<HashMap<String, u32>>,
    put_failures: Mutex<HashSet<String>>,
    delete_failures: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn insert(&self, key: &str, body: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), body);
    }

    /// Remove `key` without counting an operation.
    pub fn delete_now(&self, key: &str) {
        self.objects.lock().unwrap().remove(key);
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total calls across get, put and delete.
    pub fn op_count(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    pub fn get_count(&self, key: &str) -> u32 {
        self.gets.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Fail the next `times` reads of `key`.
    pub fn fail_get(&self, key: &str, times: u32) {
        self.get_failures
            .lock()
            .unwrap()
            .insert(key.to_string(), times);
    }

    pub fn fail_put(&self, key: &str) {
        self.put_failures.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_delete(&self, key: &str) {
        self.delete_failures.lock().unwrap().insert(key.to_string());
    }
}

impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        *self.gets.lock().unwrap().entry(key.to_string()).or_default() += 1;
        {
            let mut failures = self.get_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StorageError::backend("get", key, "injected read failure"));
                }
            }
        }
        Ok(self.object(key))
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        if self.put_failures.lock().unwrap().contains(key) {
            return Err(StorageError::backend("put", key, "injected write failure"));
        }
        self.insert(key, body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        if self.delete_failures.lock().unwrap().contains(key) {
            return Err(StorageError::backend("delete", key, "injected delete failure"));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}

// ---------------------------------------------------------------------------
// Batch record store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryMetadata {
    records: Mutex<Vec<(String, BatchCompletionRecord)>>,
    /// Remaining forced failures for `put_record`.
    failures: AtomicU32,
    attempts: AtomicU32,
}

impl MemoryMetadata {
    pub fn failing(times: u32) -> Self {
        Self {
            failures: AtomicU32::new(times),
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<(String, BatchCompletionRecord)> {
        self.records.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl BatchRecordStore for MemoryMetadata {
    async fn put_record(
        &self,
        table: &TableName,
        record: &BatchCompletionRecord,
    ) -> Result<(), DbError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }

        let mut records = self.records.lock().unwrap();
        records.retain(|(t, r)| {
            !(t == table.as_str() && r.job_id == record.job_id && r.batch_id == record.batch_id)
        });
        records.push((table.to_string(), record.clone()));
        Ok(())
    }

    async fn find_live(
        &self,
        table: &TableName,
        job_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<BatchCompletionRecord>, DbError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, r)| t == table.as_str() && r.job_id == job_id && !r.is_expired(now))
            .map(|(_, r)| r.clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Context helpers
// ---------------------------------------------------------------------------

pub fn config(prefix: &str, delete_tiles: bool) -> PipelineConfig {
    let prefix = prefix.to_string();
    PipelineConfig::from_lookup(move |var| match var {
        "STORAGE_BACKEND" => Some("local".into()),
        "OUTPUT_PREFIX" => Some(prefix.clone()),
        "DELETE_TILES" => Some(delete_tiles.to_string()),
        "TILE_CONCURRENCY" => Some("4".into()),
        "FETCH_CONCURRENCY" => Some("4".into()),
        _ => None,
    })
    .unwrap()
}

pub fn context(
    config: PipelineConfig,
    metadata: MemoryMetadata,
) -> PipelineContext<MemoryStore, MemoryMetadata> {
    PipelineContext::new(config, MemoryStore::default())
        .with_metadata(metadata)
        .with_retry_policy(RetryPolicy::immediate(3))
}

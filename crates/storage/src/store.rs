//! The object-store seam and the runtime-selected backend.

use std::future::Future;

use crate::error::StorageError;
use crate::local::LocalObjectStore;
use crate::s3::S3ObjectStore;

/// Key/value blob storage addressed by `/`-separated keys.
pub trait ObjectStore: Send + Sync {
    /// Read an object. `Ok(None)` means the key does not exist.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send;

    /// Write an object, replacing any existing one. Readers never observe a
    /// partial write.
    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete an object. Deleting a missing key succeeds.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Human-readable location of `key`, e.g. `s3://bucket/key`.
    fn location(&self, key: &str) -> String;
}

/// Backend chosen at startup from configuration.
#[derive(Debug, Clone)]
pub enum AnyObjectStore {
    S3(S3ObjectStore),
    Local(LocalObjectStore),
}

impl ObjectStore for AnyObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self {
            Self::S3(s) => s.get(key).await,
            Self::Local(s) => s.get(key).await,
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        match self {
            Self::S3(s) => s.put(key, body, content_type).await,
            Self::Local(s) => s.put(key, body, content_type).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::S3(s) => s.delete(key).await,
            Self::Local(s) => s.delete(key).await,
        }
    }

    fn location(&self, key: &str) -> String {
        match self {
            Self::S3(s) => s.location(key),
            Self::Local(s) => s.location(key),
        }
    }
}

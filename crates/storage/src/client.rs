//! Object-store client with bounded retries on reads.

use crate::error::StorageError;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::ObjectStore;

/// Result of a single retried read.
#[derive(Debug)]
pub enum FetchOutcome {
    Found(Vec<u8>),
    /// The key does not exist. Not retried.
    NotFound,
    /// Every attempt failed; carries the last error.
    TransientError(StorageError),
}

/// Wraps an [`ObjectStore`], retrying reads under a [`RetryPolicy`].
/// Writes and deletes pass straight through.
#[derive(Debug, Clone)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: ObjectStore> RetryingStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    pub fn with_policy(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Read `key`, retrying transient failures.
    pub async fn fetch(&self, key: &str) -> FetchOutcome {
        match self.get_with_retry(key).await {
            Ok(Some(bytes)) => FetchOutcome::Found(bytes),
            Ok(None) => FetchOutcome::NotFound,
            Err(e) => FetchOutcome::TransientError(e),
        }
    }

    /// Read `key`, retrying transient failures. `Ok(None)` when missing.
    pub async fn get_with_retry(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        with_retry(&self.policy, "get", key, || self.inner.get(key)).await
    }

    pub async fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.inner.put(key, body, content_type).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }

    /// Delete `key`, logging instead of returning a failure.
    pub async fn remove_best_effort(&self, key: &str) -> bool {
        match self.remove(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to delete object");
                false
            }
        }
    }

    pub fn location(&self, key: &str) -> String {
        self.inner.location(key)
    }
}

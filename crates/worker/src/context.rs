//! Dependencies shared by the worker and combiner entry points.

use burst_storage::{ObjectStore, RetryPolicy, RetryingStore};

use crate::config::PipelineConfig;

/// Storage, metadata sink and configuration for one invocation.
///
/// `M` is the batch record store; the combiner never writes records and
/// runs with `M = ()`.
pub struct PipelineContext<S, M = ()> {
    pub config: PipelineConfig,
    pub store: RetryingStore<S>,
    pub metadata: M,
    /// Policy for the completion-record write.
    pub metadata_retry: RetryPolicy,
}

impl<S: ObjectStore> PipelineContext<S, ()> {
    pub fn new(config: PipelineConfig, store: S) -> Self {
        Self {
            config,
            store: RetryingStore::new(store),
            metadata: (),
            metadata_retry: RetryPolicy::default(),
        }
    }
}

impl<S: ObjectStore, M> PipelineContext<S, M> {
    /// Attach a batch record store.
    pub fn with_metadata<N>(self, metadata: N) -> PipelineContext<S, N> {
        PipelineContext {
            config: self.config,
            store: self.store,
            metadata,
            metadata_retry: self.metadata_retry,
        }
    }

    /// Replace the retry policy for both tile reads and record writes.
    pub fn with_retry_policy(self, policy: RetryPolicy) -> Self {
        let store = RetryingStore::with_policy(self.store.into_inner(), policy);
        Self {
            store,
            metadata_retry: policy,
            ..self
        }
    }
}

//! Object storage for tiles and final images.
//!
//! [`ObjectStore`] is the backend seam ([`S3ObjectStore`],
//! [`LocalObjectStore`]); [`RetryingStore`] layers the bounded-retry read
//! policy on top.

pub mod client;
pub mod error;
pub mod local;
pub mod retry;
pub mod s3;
pub mod store;

pub use client::{FetchOutcome, RetryingStore};
pub use error::StorageError;
pub use local::LocalObjectStore;
pub use retry::{with_retry, RetryPolicy};
pub use s3::S3ObjectStore;
pub use store::{AnyObjectStore, ObjectStore};

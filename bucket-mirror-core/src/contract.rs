//! # contract: the object-store seam
//!
//! The pipeline never talks to a storage service directly. It hands a fully
//! prepared [`PutObjectRequest`] to an [`ObjectStore`] and interprets the
//! classified [`StoreError`] it gets back.
//!
//! ## Error classification
//! - [`StoreError::Service`] and [`StoreError::Transport`] are transient as far as
//!   the pipeline is concerned: the worker retries them under its retry policy.
//! - [`StoreError::Unclassified`] is anything the implementor could not attribute
//!   to the service or the wire. The worker treats it as fatal and never retries.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so consumers get `MockObjectStore` under
//!   the default `test-export-mocks` feature.

use async_trait::async_trait;
use thiserror::Error;

#[allow(unused_imports)]
use mockall::{automock, predicate::*};

/// A single-object upload.
#[derive(Debug)]
pub struct PutObjectRequest {
    pub bucket: String,
    /// Destination key, e.g. `/site/a.txt`.
    pub key: String,
    /// Canned ACL value (e.g. `private`, `public-read`).
    pub acl: String,
    pub content_type: String,
    pub cache_control: Option<String>,
    /// Open handle on the local file; the store streams it as the request body.
    pub body: tokio::fs::File,
}

/// Failure reported by an [`ObjectStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The service answered with an error.
    #[error("service error {code}: {message}")]
    Service { code: String, message: String },

    /// The request did not complete: timeout, dispatch failure, unreadable response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Any failure not attributable to the service or the transport.
    #[error("{0}")]
    Unclassified(String),
}

impl StoreError {
    /// Whether the failure may succeed if the same request is sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Service { .. } | StoreError::Transport(_))
    }
}

/// Trait for writing objects into a bucket.
///
/// The implementor owns connection handling, authentication and per-attempt
/// timeouts. Implementations must be shareable across worker tasks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload one object, consuming the request body.
    async fn put_object(&self, req: PutObjectRequest) -> Result<(), StoreError>;
}

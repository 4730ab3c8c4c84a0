//! Error types for the mirror pipeline.
//!
//! Every variant is fatal for the run. Transient store failures never surface
//! here directly: the upload worker retries them and only reports
//! [`MirrorError::RetriesExhausted`] once its budget is spent.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::contract::StoreError;

#[derive(Error, Debug)]
pub enum MirrorError {
    /// Invalid or incomplete configuration, detected before any upload.
    #[error("configuration error: {0}")]
    Config(String),

    /// An ignore pattern failed to compile.
    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// The directory walk failed (permission denied, entry removed mid-walk, ...).
    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// An enumerated entry could not be classified.
    #[error("failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A local file could not be opened for upload.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A retryable store failure persisted through every attempt.
    #[error("failed to upload {path} after {attempts} attempts: {source}")]
    RetriesExhausted {
        path: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// The store reported a failure that is not eligible for retry.
    #[error("unknown error uploading {path}: {source}")]
    Unrecoverable {
        path: String,
        #[source]
        source: StoreError,
    },

    /// The blocking enumeration task ended without reporting a result.
    #[error("file enumeration terminated abnormally: {reason}")]
    EnumerationAborted { reason: String },

    /// A task could not be placed on the upload queue.
    #[error("failed to queue {path}: {reason}")]
    Queue { path: String, reason: String },

    /// A worker task ended without reporting a result.
    #[error("upload worker {worker_id} terminated abnormally: {reason}")]
    WorkerAborted { worker_id: usize, reason: String },
}

impl MirrorError {
    /// Relative path of the file that caused the failure, when there is one.
    pub fn failed_path(&self) -> Option<&str> {
        match self {
            MirrorError::RetriesExhausted { path, .. } | MirrorError::Unrecoverable { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}

//! Upload worker: transfer one enumerated file to the store, retrying transient failures.
//!
//! A single attempt opens the local file, derives its content type from the
//! extension, and issues one `put_object`. [`UploadWorker::upload_with_retry`]
//! wraps attempts in a bounded loop governed by [`RetryPolicy`]:
//!
//! - success on attempt `k` returns immediately,
//! - a retryable [`StoreError`] sleeps for the fixed backoff and tries again,
//! - any other failure, or the last retryable one, is returned as fatal.
//!
//! Dry-run attempts still open the file and print the destination, but never
//! reach the store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::{MirrorConfig, RetryPolicy};
use crate::contract::{ObjectStore, PutObjectRequest, StoreError};
use crate::enumerate::UploadTask;
use crate::error::MirrorError;

/// Content type used when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Why a single attempt failed.
#[derive(Debug)]
pub enum AttemptError {
    /// Local failure; never retried.
    Local(MirrorError),
    /// Failure reported by the store; retried only if the store classified it as retryable.
    Store(StoreError),
}

/// Content type for `relative_path`, falling back to [`DEFAULT_CONTENT_TYPE`].
pub fn content_type_for(relative_path: &str) -> String {
    mime_guess::from_path(relative_path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

/// Performs uploads for one source tree against one store. Cheap to clone; shared by all workers.
pub struct UploadWorker<S: ObjectStore + ?Sized> {
    config: Arc<MirrorConfig>,
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: ObjectStore + ?Sized> Clone for UploadWorker<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            retry: self.retry,
        }
    }
}

impl<S: ObjectStore + ?Sized> UploadWorker<S> {
    pub fn new(config: Arc<MirrorConfig>, store: Arc<S>, retry: RetryPolicy) -> Self {
        Self {
            config,
            store,
            retry,
        }
    }

    fn local_path(&self, task: &UploadTask) -> PathBuf {
        self.config.source.join(&task.source_path)
    }

    /// One attempt. Returns the number of files uploaded: 1 live, 0 in dry-run mode.
    pub async fn upload_one(&self, task: &UploadTask, dry_run: bool) -> Result<u64, AttemptError> {
        let local_path = self.local_path(task);
        let body = tokio::fs::File::open(&local_path).await.map_err(|source| {
            AttemptError::Local(MirrorError::Open {
                path: local_path.clone(),
                source,
            })
        })?;

        let content_type = content_type_for(&task.relative_path);
        let key = task.destination_key(&self.config.prefix);

        println!("{}", upload_notice(&key, dry_run));
        if dry_run {
            debug!(key = %key, content_type = %content_type, "[UPLOAD] Dry run, skipping transfer");
            return Ok(0);
        }

        let req = PutObjectRequest {
            bucket: self.config.bucket.clone(),
            key,
            acl: self.config.acl().to_string(),
            content_type,
            cache_control: self.config.cache_control.clone(),
            body,
        };
        self.store.put_object(req).await.map_err(AttemptError::Store)?;
        debug!(path = %task.relative_path, "[UPLOAD] put_object succeeded");
        Ok(1)
    }

    /// Attempt `task` up to `max_attempts` times, sleeping `backoff` between retryable failures.
    pub async fn upload_with_retry(&self, task: &UploadTask, dry_run: bool) -> Result<u64, MirrorError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let store_error = match self.upload_one(task, dry_run).await {
                Ok(count) => return Ok(count),
                Err(AttemptError::Local(e)) => {
                    error!(path = %task.relative_path, error = %e, "[UPLOAD][ERROR] Local failure, not retrying");
                    return Err(e);
                }
                Err(AttemptError::Store(e)) if !e.is_retryable() => {
                    error!(path = %task.relative_path, error = %e, "[UPLOAD][ERROR] Unrecoverable store failure");
                    return Err(MirrorError::Unrecoverable {
                        path: task.relative_path.clone(),
                        source: e,
                    });
                }
                Err(AttemptError::Store(e)) => e,
            };

            warn!(
                path = %task.relative_path,
                attempt,
                max_attempts,
                error = %store_error,
                "[UPLOAD] Retryable store failure"
            );
            if attempt < max_attempts {
                println!("{}", retry_notice(&task.relative_path, self.retry.backoff));
                tokio::time::sleep(self.retry.backoff).await;
            }
            last_error = Some(store_error);
        }

        let source = last_error.unwrap_or_else(|| StoreError::Unclassified("no attempt was made".into()));
        error!(path = %task.relative_path, attempts = max_attempts, "[UPLOAD][ERROR] Retries exhausted");
        Err(MirrorError::RetriesExhausted {
            path: task.relative_path.clone(),
            attempts: max_attempts,
            source,
        })
    }
}

/// Progress line printed before each attempt.
pub fn upload_notice(key: &str, dry_run: bool) -> String {
    if dry_run {
        format!("[DRYRUN] uploading {key} ...")
    } else {
        format!("uploading {key} ...")
    }
}

/// Line printed when a retryable failure will be attempted again after `backoff`.
pub fn retry_notice(relative_path: &str, backoff: Duration) -> String {
    format!(
        "failed to upload {relative_path}, retrying in {} ...",
        describe_backoff(backoff)
    )
}

fn describe_backoff(backoff: Duration) -> String {
    match backoff.as_millis() {
        1000 => "1 second".to_string(),
        ms if ms % 1000 == 0 => format!("{} seconds", ms / 1000),
        ms => format!("{ms} ms"),
    }
}

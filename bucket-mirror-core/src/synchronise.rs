//! High-level pipeline: enumerate the source tree, then upload it with a fixed worker pool.
//!
//! # Flow
//! 1. Enumerate once (on the blocking pool). Any enumeration error is returned
//!    as-is and nothing is uploaded.
//! 2. Load every task into a queue sized to the task count and close it for
//!    writing. No task is added after the workers start.
//! 3. Spawn exactly `parallelism` workers. Each pulls one task at a time, runs
//!    it through [`UploadWorker::upload_with_retry`], and adds the returned count
//!    (0 or 1) to a shared atomic total.
//! 4. Wait for every worker, then return the total.
//!
//! # Error Handling
//! The first fatal error raised by any worker sets a shared stop flag: every
//! worker stops pulling new tasks, in-flight uploads finish, and the run returns
//! that error. "First" is by time: the error is recorded where the flag is set,
//! and later failures from in-flight uploads are only logged. A failed run
//! never reports a partial count.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use crate::config::{MirrorConfig, RetryPolicy};
use crate::contract::ObjectStore;
use crate::enumerate::{list_files, UploadTask};
use crate::error::MirrorError;
use crate::filter::PathFilter;
use crate::upload::UploadWorker;

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorReport {
    pub run_id: String,
    /// Files that passed the filter.
    pub files_enumerated: usize,
    /// Files actually transferred; always 0 for a dry run.
    pub files_uploaded: u64,
    pub dry_run: bool,
    pub parallelism: usize,
    pub elapsed: Duration,
}

/// Orchestrates one source tree against one store.
pub struct Mirror<S: ObjectStore + ?Sized + 'static> {
    config: Arc<MirrorConfig>,
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: ObjectStore + ?Sized + 'static> Mirror<S> {
    pub fn new(config: MirrorConfig, store: Arc<S>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Relative paths that would be uploaded, in walk order.
    pub async fn list_files(&self) -> Result<Vec<UploadTask>, MirrorError> {
        let filter = PathFilter::new(self.config.ignore.as_slice())?;
        let source = self.config.source.clone();
        tokio::task::spawn_blocking(move || list_files(&source, &filter))
            .await
            .map_err(|e| MirrorError::EnumerationAborted {
                reason: e.to_string(),
            })?
    }

    /// Mirror the source tree with `parallelism` concurrent workers.
    pub async fn run(&self, parallelism: usize, dry_run: bool) -> Result<MirrorReport, MirrorError> {
        if parallelism == 0 {
            return Err(MirrorError::Config("parallelism must be at least 1".into()));
        }
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("mirror", run_id = %run_id);
        self.run_inner(run_id, parallelism, dry_run).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: String,
        parallelism: usize,
        dry_run: bool,
    ) -> Result<MirrorReport, MirrorError> {
        let started = Instant::now();
        info!(
            bucket = %self.config.bucket,
            prefix = %self.config.prefix,
            parallelism,
            dry_run,
            "[SYNC] Starting mirror run"
        );

        let tasks = match self.list_files().await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(error = %e, "[SYNC][ERROR] Enumeration failed");
                return Err(e);
            }
        };
        let files_enumerated = tasks.len();

        let (tx, rx) = async_channel::bounded::<UploadTask>(files_enumerated.max(1));
        for task in tasks {
            // Capacity equals the task count, so only a closed queue can reject.
            if let Err(e) = tx.try_send(task) {
                let task = e.into_inner();
                error!(path = %task.relative_path, "[SYNC][ERROR] Upload queue rejected task");
                return Err(MirrorError::Queue {
                    path: task.relative_path,
                    reason: "upload queue rejected the task".into(),
                });
            }
        }
        tx.close();

        let uploaded = Arc::new(AtomicU64::new(0));
        let failure = Failure::default();
        let worker = UploadWorker::new(Arc::clone(&self.config), Arc::clone(&self.store), self.retry);

        info!(workers = parallelism, files = files_enumerated, "[SYNC] Starting upload workers");
        let handles: Vec<_> = (0..parallelism)
            .map(|worker_id| {
                let worker = worker.clone();
                let rx = rx.clone();
                let uploaded = Arc::clone(&uploaded);
                let failure = failure.clone();
                tokio::spawn(
                    worker_loop(worker_id, worker, rx, uploaded, failure, dry_run).in_current_span(),
                )
            })
            .collect();
        drop(rx);

        for (worker_id, joined) in join_all(handles).await.into_iter().enumerate() {
            if let Err(e) = joined {
                failure.record(
                    worker_id,
                    MirrorError::WorkerAborted {
                        worker_id,
                        reason: e.to_string(),
                    },
                );
            }
        }
        if let Some(e) = failure.take() {
            return Err(e);
        }

        let report = MirrorReport {
            run_id,
            files_enumerated,
            files_uploaded: uploaded.load(Ordering::SeqCst),
            dry_run,
            parallelism,
            elapsed: started.elapsed(),
        };
        info!(
            files_enumerated = report.files_enumerated,
            files_uploaded = report.files_uploaded,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "[SYNC] Mirror run complete"
        );
        match serde_json::to_string(&report) {
            Ok(json) => debug!(json = %json, "[SYNC][DEBUG] MirrorReport as JSON"),
            Err(e) => error!(error = ?e, "[SYNC][DEBUG] Failed to serialize MirrorReport as JSON"),
        }
        Ok(report)
    }
}

/// Shared stop flag plus the error that raised it.
#[derive(Clone, Default)]
struct Failure {
    stop: Arc<AtomicBool>,
    first_error: Arc<Mutex<Option<MirrorError>>>,
}

impl Failure {
    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Stop the run. Only the first recorded error is returned to the caller.
    fn record(&self, worker_id: usize, e: MirrorError) {
        self.stop.store(true, Ordering::SeqCst);
        let mut slot = self.first_error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            error!(worker_id, path = ?e.failed_path(), error = %e, "[SYNC][ERROR] Worker failed");
            *slot = Some(e);
        } else {
            error!(worker_id, path = ?e.failed_path(), error = %e, "[SYNC][ERROR] Worker failed after the run was stopped");
        }
    }

    fn take(&self) -> Option<MirrorError> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Pull tasks until the queue is drained or another worker has failed.
async fn worker_loop<S: ObjectStore + ?Sized>(
    worker_id: usize,
    worker: UploadWorker<S>,
    rx: async_channel::Receiver<UploadTask>,
    uploaded: Arc<AtomicU64>,
    failure: Failure,
    dry_run: bool,
) {
    debug!(worker_id, "Worker starting");
    let mut processed = 0u64;

    while !failure.is_stopped() {
        let task = match rx.recv().await {
            Ok(task) => task,
            Err(_) => break,
        };
        match worker.upload_with_retry(&task, dry_run).await {
            Ok(count) => {
                uploaded.fetch_add(count, Ordering::SeqCst);
                processed += 1;
            }
            Err(e) => {
                failure.record(worker_id, e);
                debug!(worker_id, processed, "Worker stopping after fatal error");
                return;
            }
        }
    }

    debug!(worker_id, processed, "Worker exited");
}

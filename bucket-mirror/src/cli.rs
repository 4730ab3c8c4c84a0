///
/// This module implements the CLI interface for bucket-mirror: command parsing,
/// the async entrypoint, and user-visible output.
///
/// All pipeline logic (filtering, enumeration, workers, retries) lives in the
/// [`bucket-mirror-core`] crate. This module only wires configuration, the S3
/// store, and the core [`Mirror`] together.
///
/// ## How To Use
/// - For command-line users: `bucket-mirror sync --config mirror.yaml [--parallel N] [--dry-run]`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`bucket-mirror-core`]: ../../bucket-mirror-core/
/// [`Mirror`]: bucket_mirror_core::synchronise::Mirror
use crate::load_config::load_config;
use crate::s3::S3Store;
use anyhow::Result;
use async_trait::async_trait;
use bucket_mirror_core::contract::{ObjectStore, PutObjectRequest, StoreError};
use bucket_mirror_core::synchronise::Mirror;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for bucket-mirror: upload a local directory tree to an S3 bucket.
#[derive(Parser)]
#[clap(
    name = "bucket-mirror",
    version,
    about = "Mirror a local directory tree onto an S3 bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload every non-ignored file under the configured source directory
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,

        /// Number of concurrent upload workers (overrides `parallel` in the config file)
        #[clap(long)]
        parallel: Option<usize>,

        /// Print what would be uploaded without transferring anything
        #[clap(long)]
        dry_run: bool,
    },
}

/// Store used for dry runs. Dry-run workers never call it, so no client or
/// region lookup is needed.
struct OfflineStore;

#[async_trait]
impl ObjectStore for OfflineStore {
    async fn put_object(&self, req: PutObjectRequest) -> Result<(), StoreError> {
        Err(StoreError::Unclassified(format!(
            "dry run cannot upload {}",
            req.key
        )))
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync {
            config,
            parallel,
            dry_run,
        } => {
            let config = load_config(config)?;
            let parallel = parallel.unwrap_or(config.parallel);
            if parallel == 0 {
                anyhow::bail!("--parallel must be at least 1");
            }

            let store: Arc<dyn ObjectStore> = if dry_run {
                tracing::info!(command = "sync", "Dry run: skipping S3 client setup");
                Arc::new(OfflineStore)
            } else {
                Arc::new(S3Store::connect(&config.store).await?)
            };

            let mirror = Mirror::new(config.mirror, store).with_retry_policy(config.retry);
            tracing::info!(command = "sync", parallel, dry_run, "Starting mirror");
            println!("Mirror starting...");

            match mirror.run(parallel, dry_run).await {
                Ok(report) => {
                    tracing::info!(command = "sync", ?report, "Mirror complete");
                    if report.dry_run {
                        println!(
                            "Mirror complete: {} file(s) uploaded (dry run, {} planned)",
                            report.files_uploaded, report.files_enumerated
                        );
                    } else {
                        println!("Mirror complete: {} file(s) uploaded", report.files_uploaded);
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Mirror failed");
                    eprintln!("[ERROR] Mirror failed: {e}");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}

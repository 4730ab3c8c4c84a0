/// `load_config` module: loads a YAML config file, injects secrets from the environment, and
/// validates it into the typed settings the core pipeline and the S3 store need.
///
/// # Responsibilities
/// - Parse user-supplied YAML into type-safe Rust structs
/// - Fill credentials from `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY` when the file omits them
/// - Reject configurations that cannot run (missing source directory, empty bucket,
///   zero parallelism, half-specified credentials) before anything is uploaded
///
/// # Errors
/// All errors use `anyhow::Error` for context-rich diagnostics, surfaced at the CLI boundary.
use anyhow::{bail, Context, Result};
use bucket_mirror_core::config::{MirrorConfig, RetryPolicy};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::s3::{StaticCredentials, StoreSettings};

pub const DEFAULT_PARALLEL: usize = 10;
pub const ENV_ACCESS_KEY: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_KEY: &str = "AWS_SECRET_ACCESS_KEY";

#[derive(Debug, Deserialize)]
pub struct S3Section {
    pub source: PathBuf,
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub path_style: bool,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub acl: Option<String>,
    #[serde(default)]
    pub cache_control: Option<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RetrySection {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub backoff_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    s3: S3Section,
    #[serde(default)]
    parallel: Option<usize>,
    #[serde(default)]
    retry: RetrySection,
}

/// Fully validated configuration for one `sync` invocation.
#[derive(Debug)]
pub struct CliConfig {
    pub mirror: MirrorConfig,
    pub store: StoreSettings,
    pub parallel: usize,
    pub retry: RetryPolicy,
}

/// Loads the YAML config at `path` and merges in environment secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let s3 = raw.s3;
    if s3.bucket.trim().is_empty() {
        bail!("s3.bucket must not be empty");
    }

    let source = fs::canonicalize(&s3.source)
        .with_context(|| format!("Source directory {:?} is not accessible", s3.source))?;
    if !source.is_dir() {
        bail!("Source {:?} is not a directory", source);
    }

    let parallel = raw.parallel.unwrap_or(DEFAULT_PARALLEL);
    if parallel == 0 {
        bail!("parallel must be at least 1");
    }

    let retry = RetryPolicy {
        max_attempts: raw.retry.max_attempts.unwrap_or(RetryPolicy::DEFAULT_MAX_ATTEMPTS),
        backoff: raw
            .retry
            .backoff_ms
            .map(Duration::from_millis)
            .unwrap_or(RetryPolicy::DEFAULT_BACKOFF),
    };
    if retry.max_attempts == 0 {
        bail!("retry.max_attempts must be at least 1");
    }

    let credentials = resolve_credentials(s3.access_key, s3.secret_key)?;

    let store = StoreSettings {
        bucket: s3.bucket.clone(),
        region: s3.region.filter(|r| !r.is_empty()),
        endpoint: s3.endpoint,
        path_style: s3.path_style,
        credentials,
    };

    let mirror = MirrorConfig {
        source,
        bucket: s3.bucket,
        prefix: s3.prefix,
        acl: s3.acl.filter(|a| !a.is_empty()),
        cache_control: s3.cache_control.filter(|c| !c.is_empty()),
        ignore: s3.ignore,
    };
    mirror.trace_loaded();

    info!(
        parallel,
        max_attempts = retry.max_attempts,
        region = ?store.region,
        "Config loaded and merged successfully"
    );

    Ok(CliConfig {
        mirror,
        store,
        parallel,
        retry,
    })
}

/// File values win; the environment fills in only when the file has neither key.
fn resolve_credentials(
    access_key: Option<String>,
    secret_key: Option<String>,
) -> Result<Option<StaticCredentials>> {
    match (access_key, secret_key) {
        (Some(access_key), Some(secret_key)) => {
            info!("Using static credentials from config file");
            Ok(Some(StaticCredentials {
                access_key,
                secret_key,
            }))
        }
        (Some(_), None) | (None, Some(_)) => {
            error!("Config specifies only one of s3.access_key / s3.secret_key");
            bail!("s3.access_key and s3.secret_key must be set together")
        }
        (None, None) => match (std::env::var(ENV_ACCESS_KEY), std::env::var(ENV_SECRET_KEY)) {
            (Ok(access_key), Ok(secret_key)) => {
                info!("Using static credentials from environment");
                Ok(Some(StaticCredentials {
                    access_key,
                    secret_key,
                }))
            }
            _ => {
                info!("No static credentials, using the default credential chain");
                Ok(None)
            }
        },
    }
}

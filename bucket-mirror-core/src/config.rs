use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Canned ACL applied to uploaded objects when none is configured.
pub const DEFAULT_ACL: &str = "private";

/// Everything the pipeline needs to know about one source tree and its destination bucket.
///
/// Credentials, region and endpoint are deliberately absent: those belong to the
/// object-store client, not to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Absolute path of the local directory to mirror.
    pub source: PathBuf,
    pub bucket: String,
    /// Key prefix under which relative paths are placed. May be empty.
    #[serde(default)]
    pub prefix: String,
    /// Canned ACL value; `None` means [`DEFAULT_ACL`].
    #[serde(default)]
    pub acl: Option<String>,
    /// Cache-Control header, only sent when set.
    #[serde(default)]
    pub cache_control: Option<String>,
    /// Glob patterns evaluated against relative paths; any match excludes the file.
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl MirrorConfig {
    pub fn acl(&self) -> &str {
        self.acl.as_deref().unwrap_or(DEFAULT_ACL)
    }

    pub fn trace_loaded(&self) {
        info!(
            source = %self.source.display(),
            bucket = %self.bucket,
            prefix = %self.prefix,
            ignore_count = self.ignore.len(),
            "Loaded MirrorConfig"
        );
        debug!(?self, "MirrorConfig loaded (full debug)");
    }
}

/// Fixed-backoff retry policy for transient store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per file, including the first one.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            backoff: Self::DEFAULT_BACKOFF,
        }
    }
}

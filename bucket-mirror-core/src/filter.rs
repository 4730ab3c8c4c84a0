//! Ignore-pattern filtering of relative paths.
//!
//! Patterns use shell-glob syntax evaluated against the `/`-separated path
//! relative to the source root. `*`, `?` and `[...]` stay within one path
//! component, and `{a,b}` matches either alternative. `**` as a whole
//! component spans any number of directories, so `drafts/**/*` excludes an
//! entire subtree. Inside a component (`**.log`) it behaves like `*` and does
//! not cross a `/`.

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::error::MirrorError;

/// Compiled set of ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    matchers: Vec<GlobMatcher>,
}

fn compile(raw: &str) -> Result<GlobMatcher, MirrorError> {
    GlobBuilder::new(raw)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| MirrorError::InvalidPattern {
            pattern: raw.to_string(),
            source,
        })
}

impl PathFilter {
    /// Compile `patterns` in order. The first malformed pattern is reported.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, MirrorError> {
        let matchers = patterns
            .iter()
            .map(|raw| compile(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { matchers })
    }

    /// `false` as soon as one pattern matches `relative_path`, `true` otherwise.
    pub fn is_uploadable(&self, relative_path: &str) -> bool {
        match self
            .matchers
            .iter()
            .find(|matcher| matcher.is_match(relative_path))
        {
            Some(matcher) => {
                debug!(path = relative_path, pattern = matcher.glob().glob(), "Ignored by pattern");
                false
            }
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

/// One-shot check: compile `patterns` and test `relative_path` against them.
pub fn is_uploadable<S: AsRef<str>>(relative_path: &str, patterns: &[S]) -> Result<bool, MirrorError> {
    Ok(PathFilter::new(patterns)?.is_uploadable(relative_path))
}

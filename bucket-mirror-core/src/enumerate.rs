//! File enumeration: walk the source tree and collect uploadable relative paths.

use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::error::MirrorError;
use crate::filter::PathFilter;

/// One file to upload, addressed by its `/`-separated path relative to the source root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadTask {
    /// Used for filtering and the destination key. Invalid UTF-8 is replaced with U+FFFD.
    pub relative_path: String,
    /// On-disk location relative to the source root.
    pub source_path: PathBuf,
}

impl UploadTask {
    pub fn new(relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        Self {
            source_path: PathBuf::from(&relative_path),
            relative_path,
        }
    }

    fn from_entry(relative_path: String, source_path: &Path) -> Self {
        Self {
            relative_path,
            source_path: source_path.to_path_buf(),
        }
    }

    /// Remote key for this file under `prefix`.
    pub fn destination_key(&self, prefix: &str) -> String {
        destination_key(prefix, &self.relative_path)
    }
}

/// `"/" + prefix + "/" + relative_path`, with empty segments and doubled slashes collapsed.
pub fn destination_key(prefix: &str, relative_path: &str) -> String {
    let segments: Vec<&str> = prefix
        .split('/')
        .chain(relative_path.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    format!("/{}", segments.join("/"))
}

/// List every regular file under `source_root` that passes `filter`.
///
/// Ignored entries are skipped individually: an ignored directory is still
/// descended into, and its children are tested on their own paths. Directories
/// themselves are never returned. The first I/O error aborts the walk and no
/// partial result is returned.
pub fn list_files(source_root: &Path, filter: &PathFilter) -> Result<Vec<UploadTask>, MirrorError> {
    info!(source = %source_root.display(), patterns = filter.len(), "[ENUMERATE] Walking source tree");

    let mut tasks = Vec::new();
    for entry in WalkDir::new(source_root).follow_links(false) {
        let entry = entry.map_err(|source| {
            let path = source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source_root.to_path_buf());
            error!(path = %path.display(), error = %source, "[ENUMERATE][ERROR] Walk failed");
            MirrorError::Walk { path, source }
        })?;

        let Ok(on_disk) = entry.path().strip_prefix(source_root) else {
            continue;
        };
        let relative = slash_joined(on_disk);
        if relative.is_empty() {
            continue;
        }

        if !filter.is_uploadable(&relative) {
            continue;
        }

        // Follows symlinks, so a link to a file counts as a file.
        let metadata = std::fs::metadata(entry.path()).map_err(|source| {
            error!(path = %entry.path().display(), error = %source, "[ENUMERATE][ERROR] Stat failed");
            MirrorError::Stat {
                path: entry.path().to_path_buf(),
                source,
            }
        })?;
        if !metadata.is_file() {
            continue;
        }

        if on_disk.to_str().is_none() {
            warn!(path = %relative, "[ENUMERATE] File name is not valid UTF-8, key uses a lossy form");
        }
        debug!(path = %relative, "[ENUMERATE] Queued file");
        tasks.push(UploadTask::from_entry(relative, on_disk));
    }

    info!(files = tasks.len(), "[ENUMERATE] Enumeration complete");
    Ok(tasks)
}

/// `relative` joined with `/` regardless of platform.
fn slash_joined(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

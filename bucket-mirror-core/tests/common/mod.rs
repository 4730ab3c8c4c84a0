#![allow(dead_code)]

use bucket_mirror_core::config::MirrorConfig;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Creates a temp source tree containing `files` (relative, `/`-separated), each with its own path as content.
pub fn source_tree(files: &[&str]) -> TempDir {
    let dir = tempdir().expect("temp dir");
    for file in files {
        let path = dir.path().join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, file.as_bytes()).expect("write fixture file");
    }
    dir
}

pub fn mirror_config(source: &Path, prefix: &str, ignore: &[&str]) -> MirrorConfig {
    MirrorConfig {
        source: source.to_path_buf(),
        bucket: "test-bucket".to_string(),
        prefix: prefix.to_string(),
        acl: None,
        cache_control: None,
        ignore: ignore.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn sorted(mut paths: Vec<String>) -> Vec<String> {
    paths.sort();
    paths
}

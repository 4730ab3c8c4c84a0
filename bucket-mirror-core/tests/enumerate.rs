mod common;

use bucket_mirror_core::enumerate::{destination_key, list_files, UploadTask};
use bucket_mirror_core::filter::PathFilter;
use bucket_mirror_core::MirrorError;
use common::{sorted, source_tree};
use std::fs;

fn enumerate(root: &std::path::Path, ignore: &[&str]) -> Vec<String> {
    let filter = PathFilter::new(ignore).expect("valid patterns");
    let tasks = list_files(root, &filter).expect("enumeration should succeed");
    sorted(tasks.into_iter().map(|t| t.relative_path).collect())
}

#[test]
fn test_lists_every_regular_file_once() {
    let tree = source_tree(&["a.txt", "b.png", "sub/c.txt", "sub/deeper/d.md"]);
    fs::create_dir_all(tree.path().join("empty/dir")).unwrap();

    let files = enumerate(tree.path(), &[]);
    assert_eq!(files, vec!["a.txt", "b.png", "sub/c.txt", "sub/deeper/d.md"]);
}

#[test]
fn test_ignore_pattern_excludes_subdirectory_files() {
    let tree = source_tree(&["a.txt", "b.png", "sub/c.txt"]);

    let files = enumerate(tree.path(), &["sub/*"]);
    assert_eq!(files, vec!["a.txt", "b.png"]);
}

#[test]
fn test_adding_pattern_removes_exactly_the_matched_path() {
    let tree = source_tree(&["a.txt", "b.png", "sub/c.txt", "sub/b.png"]);
    let before = enumerate(tree.path(), &["*.tmp"]);
    let after = enumerate(tree.path(), &["*.tmp", "b.png"]);

    let removed: Vec<_> = before.iter().filter(|p| !after.contains(p)).collect();
    assert_eq!(removed, vec!["b.png"]);
    assert_eq!(after.len(), before.len() - 1);
}

#[test]
fn test_ignored_directory_is_still_descended() {
    // "sub" only names the directory itself; its children are tested on their own paths.
    let tree = source_tree(&["a.txt", "sub/c.txt"]);

    let files = enumerate(tree.path(), &["sub"]);
    assert_eq!(files, vec!["a.txt", "sub/c.txt"]);
}

#[test]
fn test_recursive_pattern_excludes_whole_subtree() {
    let tree = source_tree(&["keep.txt", "drafts/one.md", "drafts/2024/two.md"]);

    let files = enumerate(tree.path(), &["drafts/**/*"]);
    assert_eq!(files, vec!["keep.txt"]);
}

#[test]
fn test_missing_root_aborts_enumeration() {
    let tree = source_tree(&[]);
    let missing = tree.path().join("does-not-exist");

    let err = list_files(&missing, &PathFilter::default()).expect_err("walk must fail");
    assert!(matches!(err, MirrorError::Walk { .. }), "got {err:?}");
}

#[test]
fn test_empty_root_yields_nothing() {
    let tree = source_tree(&[]);
    assert!(enumerate(tree.path(), &[]).is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_classified_by_target() {
    use std::os::unix::fs::symlink;

    let tree = source_tree(&["real.txt"]);
    symlink(tree.path().join("real.txt"), tree.path().join("link.txt")).unwrap();

    let files = enumerate(tree.path(), &[]);
    assert_eq!(files, vec!["link.txt", "real.txt"]);

    symlink(tree.path().join("gone.txt"), tree.path().join("dangling.txt")).unwrap();
    let err = list_files(tree.path(), &PathFilter::default()).expect_err("dangling link must fail");
    assert!(matches!(err, MirrorError::Stat { .. }), "got {err:?}");

    // An ignored dangling link is never inspected.
    let files = enumerate(tree.path(), &["dangling.txt"]);
    assert_eq!(files, vec!["link.txt", "real.txt"]);
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_names_keep_their_on_disk_path() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tree = source_tree(&["a.txt"]);
    let raw = OsStr::from_bytes(b"caf\xe9.txt");
    std::fs::write(tree.path().join(raw), b"latin-1 name").unwrap();

    let mut tasks = list_files(tree.path(), &PathFilter::default()).expect("walk should succeed");
    tasks.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].relative_path, "a.txt");
    assert_eq!(tasks[1].relative_path, "caf\u{FFFD}.txt");
    assert_eq!(tasks[1].source_path.as_os_str(), raw);
    assert!(tree.path().join(&tasks[1].source_path).is_file());
}

#[test]
fn test_destination_keys() {
    let cases = [
        ("site", "a.txt", "/site/a.txt"),
        ("", "a.txt", "/a.txt"),
        ("site/", "sub/c.txt", "/site/sub/c.txt"),
        ("/nested/prefix/", "b.png", "/nested/prefix/b.png"),
    ];
    for (prefix, relative, expected) in cases {
        assert_eq!(destination_key(prefix, relative), expected, "prefix={prefix:?}");
        assert_eq!(UploadTask::new(relative).destination_key(prefix), expected);
    }
}

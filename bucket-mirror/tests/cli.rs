use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile, TempDir};

/// Source tree `{a.txt, b.png, sub/c.txt}`.
fn create_source_tree() -> TempDir {
    let dir = tempdir().expect("Creating temp source dir failed");
    fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
    fs::write(dir.path().join("b.png"), b"\x89PNG").unwrap();
    fs::create_dir_all(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/c.txt"), b"gamma").unwrap();
    dir
}

fn create_config(source: &Path, extra: &str) -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    let yaml = format!(
        "s3:\n  source: {:?}\n  bucket: mirror-test\n  prefix: site\n  region: eu-west-1\n  ignore:\n    - \"sub/*\"\n{extra}",
        source.display().to_string()
    );
    fs::write(config.path(), yaml).expect("Writing temp config failed");
    config
}

#[test]
fn sync_dry_run_lists_destinations_without_uploading() {
    let source = create_source_tree();
    let config = create_config(source.path(), "parallel: 2\n");

    let mut cmd = Command::cargo_bin("bucket-mirror").expect("Binary exists");
    cmd.arg("sync").arg("--config").arg(config.path()).arg("--dry-run");

    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("[DRYRUN] uploading /site/a.txt ...")
                .and(predicate::str::contains("[DRYRUN] uploading /site/b.png ..."))
                .and(predicate::str::contains("sub/c.txt").not())
                .and(predicate::str::contains("Mirror complete: 0 file(s) uploaded")),
        );
}

#[test]
fn sync_fails_for_missing_config_file() {
    let mut cmd = Command::cargo_bin("bucket-mirror").expect("Binary exists");
    cmd.arg("sync").arg("--config").arg("definitely-missing.yaml");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn sync_rejects_zero_parallelism() {
    let source = create_source_tree();
    let config = create_config(source.path(), "");

    let mut cmd = Command::cargo_bin("bucket-mirror").expect("Binary exists");
    cmd.args(["sync", "--dry-run", "--parallel", "0", "--config"])
        .arg(config.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--parallel must be at least 1"));
}

#[test]
fn sync_fails_before_upload_on_malformed_ignore_pattern() {
    let source = create_source_tree();
    let config = NamedTempFile::new().unwrap();
    fs::write(
        config.path(),
        format!(
            "s3:\n  source: {:?}\n  bucket: mirror-test\n  ignore:\n    - \"[abc\"\n",
            source.path().display().to_string()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("bucket-mirror").expect("Binary exists");
    cmd.arg("sync").arg("--config").arg(config.path()).arg("--dry-run");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("uploading").not())
        .stderr(predicate::str::contains("[ERROR] Mirror failed: invalid ignore pattern '[abc'"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use bucket_mirror::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Sync {
            config: std::path::PathBuf::from("dummy.yaml"),
            parallel: None,
            dry_run: true,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "dummy config must not load");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

use std::path::PathBuf;
use std::time::Duration;

use focusflow_lib::activity::{ActivitySnapshot, ActivitySource, FileWatchSource, SourceKind};
use focusflow_lib::error::FocusError;

async fn capture_within(source: &mut FileWatchSource, limit: Duration) -> Option<ActivitySnapshot> {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if let Some(snapshot) = source.capture().await.unwrap() {
            return Some(snapshot);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    None
}

#[tokio::test]
async fn edits_become_file_diff_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".git")).unwrap();
    std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
    let mut source = FileWatchSource::with_debounce(dir.path(), Duration::from_millis(100)).unwrap();
    assert_eq!(source.kind(), SourceKind::FileDiff);

    // Nothing happened yet.
    assert!(source.capture().await.unwrap().is_none());

    std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
    std::fs::write(dir.path().join("node_modules/pkg/index.js"), "module.exports = 1").unwrap();
    std::fs::write(dir.path().join("login.py"), "def check_password(user):\n    pass\n").unwrap();

    let snapshot = capture_within(&mut source, Duration::from_secs(5))
        .await
        .expect("no snapshot for the edit");
    assert_eq!(snapshot.source_kind, SourceKind::FileDiff);
    assert!(snapshot.content.contains("== login.py =="));
    assert!(snapshot.content.contains("check_password"));
    assert!(snapshot.touched_paths.contains(&PathBuf::from("login.py")));
    assert!(!snapshot.content.contains("refs/heads"));
    assert!(!snapshot.content.contains("module.exports"));

    // The batch was consumed.
    assert!(source.capture().await.unwrap().is_none());
}

#[tokio::test]
async fn closed_sources_stay_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = FileWatchSource::with_debounce(dir.path(), Duration::from_millis(50)).unwrap();
    source.close();

    std::fs::write(dir.path().join("notes.md"), "hello").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(source.capture().await.unwrap().is_none());
}

#[tokio::test]
async fn missing_roots_are_configuration_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let Err(err) = FileWatchSource::new(&missing) else {
        panic!("watching a missing directory should fail");
    };
    assert!(matches!(err, FocusError::Configuration(_)));
}

use chrono::NaiveDate;
use serde_json::Value;
use tempfile::tempdir;

use playlist_snapshot_collector as lib;
use lib::api::mock::MockSource;
use lib::collect::run_collect;
use lib::error::CollectError;
use lib::models::{Delta, TrackKey, TrackRecord};
use lib::reconcile::{Outcome, Reconciler};
use lib::store::{DatedLayout, FsStore, JsonStore};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn record(name: &str, artist: &str, url: &str) -> TrackRecord {
    TrackRecord {
        name: name.into(),
        artist: artist.into(),
        album: "Some Album".into(),
        release_date: "2020-02-02".into(),
        url: url.into(),
        added_at: "2024-01-01T00:00:00Z".into(),
    }
}

fn key(name: &str, artist: &str, url: &str) -> TrackKey {
    TrackKey { name: name.into(), artist: artist.into(), url: url.into() }
}

/// Store that reports every path as present and fails reads and/or writes
/// with an I/O error. Records the paths it was asked to write.
struct BrokenStore {
    fail_read: bool,
    writes: RefCell<Vec<PathBuf>>,
}

impl BrokenStore {
    fn new(fail_read: bool) -> Self {
        Self { fail_read, writes: RefCell::new(Vec::new()) }
    }

    fn io_error(path: &Path) -> anyhow::Error {
        CollectError::storage(
            path,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
        )
        .into()
    }
}

impl JsonStore for BrokenStore {
    fn exists(&self, path: &Path) -> bool {
        // with reads working, pretend no snapshot exists so the run goes to the write path
        self.fail_read || !path.to_string_lossy().contains("snapshot_")
    }

    fn read_json(&self, path: &Path) -> anyhow::Result<Value> {
        Err(Self::io_error(path))
    }

    fn write_json(&self, path: &Path, _value: &Value) -> anyhow::Result<()> {
        self.writes.borrow_mut().push(path.to_path_buf());
        Err(Self::io_error(path))
    }

    fn ensure_dir(&self, _dir: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}

fn files_under(dir: &std::path::Path) -> Vec<String> {
    let mut out = Vec::new();
    if let Ok(rd) = std::fs::read_dir(dir) {
        for e in rd.filter_map(|e| e.ok()) {
            out.push(e.file_name().to_string_lossy().into_owned());
        }
    }
    out.sort();
    out
}

#[test]
fn first_run_of_month_writes_snapshot_only() {
    let td = tempdir().unwrap();
    let layout = DatedLayout::new(td.path().join("data"));
    let reconciler = Reconciler::new(&FsStore, layout.clone());
    let current = vec![record("Song A", "Artist X", "url1"), record("Song B", "Artist Y", "url2")];

    let outcome = reconciler.run(day(2024, 5, 1), &current).unwrap();
    let snap = layout.snapshot_path(day(2024, 5, 1));
    assert_eq!(outcome, Outcome::SnapshotCreated { path: snap.clone(), tracks: 2 });
    assert_eq!(files_under(&layout.month_dir(day(2024, 5, 1))), vec!["snapshot_2024-05.json"]);

    let stored: Vec<TrackRecord> =
        serde_json::from_str(&std::fs::read_to_string(&snap).unwrap()).unwrap();
    assert_eq!(stored, current);
}

#[test]
fn added_track_writes_delta() {
    let td = tempdir().unwrap();
    let layout = DatedLayout::new(td.path());
    let reconciler = Reconciler::new(&FsStore, layout.clone());
    reconciler
        .run(day(2024, 5, 1), &[record("Song A", "Artist X", "url1")])
        .unwrap();

    let current = vec![record("Song A", "Artist X", "url1"), record("Song C", "Artist Z", "url3")];
    let outcome = reconciler.run(day(2024, 5, 2), &current).unwrap();
    let path = layout.delta_path(day(2024, 5, 2));
    assert_eq!(outcome, Outcome::DeltaWritten { path: path.clone(), added: 1, removed: 0 });

    let delta: Delta = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(delta.added, vec![key("Song C", "Artist Z", "url3")]);
    assert!(delta.removed.is_empty());

    // delta entries carry only the identity triple
    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let entry = raw["added"][0].as_object().unwrap();
    assert_eq!(entry.len(), 3);
    assert!(entry.get("album").is_none());
}

#[test]
fn unchanged_playlist_writes_nothing() {
    let td = tempdir().unwrap();
    let layout = DatedLayout::new(td.path());
    let reconciler = Reconciler::new(&FsStore, layout.clone());
    let current = vec![record("Song A", "Artist X", "url1")];
    reconciler.run(day(2024, 5, 1), &current).unwrap();

    assert_eq!(reconciler.run(day(2024, 5, 2), &current).unwrap(), Outcome::NoChanges);
    assert_eq!(reconciler.run(day(2024, 5, 2), &current).unwrap(), Outcome::NoChanges);
    assert_eq!(files_under(&layout.month_dir(day(2024, 5, 2))), vec!["snapshot_2024-05.json"]);
}

#[test]
fn snapshot_is_not_rewritten_within_month() {
    let td = tempdir().unwrap();
    let layout = DatedLayout::new(td.path());
    let reconciler = Reconciler::new(&FsStore, layout.clone());
    reconciler.run(day(2024, 5, 1), &[record("Song A", "Artist X", "url1")]).unwrap();
    let snap = layout.snapshot_path(day(2024, 5, 1));
    let before = std::fs::read_to_string(&snap).unwrap();

    reconciler.run(day(2024, 5, 20), &[record("Song B", "Artist Y", "url2")]).unwrap();
    assert_eq!(std::fs::read_to_string(&snap).unwrap(), before);

    let delta: Delta = serde_json::from_str(
        &std::fs::read_to_string(layout.delta_path(day(2024, 5, 20))).unwrap(),
    )
    .unwrap();
    assert_eq!(delta.added, vec![key("Song B", "Artist Y", "url2")]);
    assert_eq!(delta.removed, vec![key("Song A", "Artist X", "url1")]);
}

#[test]
fn new_month_rolls_over_to_new_snapshot() {
    let td = tempdir().unwrap();
    let layout = DatedLayout::new(td.path());
    let reconciler = Reconciler::new(&FsStore, layout.clone());
    reconciler.run(day(2024, 5, 31), &[record("Song A", "Artist X", "url1")]).unwrap();

    let june = vec![record("Song B", "Artist Y", "url2")];
    let outcome = reconciler.run(day(2024, 6, 1), &june).unwrap();
    assert!(matches!(outcome, Outcome::SnapshotCreated { tracks: 1, .. }));
    assert_eq!(files_under(&layout.month_dir(day(2024, 6, 1))), vec!["snapshot_2024-06.json"]);
}

#[test]
fn malformed_snapshot_fails_without_fallback() {
    let td = tempdir().unwrap();
    let layout = DatedLayout::new(td.path());
    let snap = layout.snapshot_path(day(2024, 5, 1));
    std::fs::create_dir_all(snap.parent().unwrap()).unwrap();
    std::fs::write(&snap, r#"{"not": "a list"}"#).unwrap();

    let reconciler = Reconciler::new(&FsStore, layout.clone());
    let err = reconciler
        .run(day(2024, 5, 2), &[record("Song A", "Artist X", "url1")])
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<CollectError>(), Some(CollectError::Malformed { .. })));
    assert!(!layout.delta_path(day(2024, 5, 2)).exists());
}

#[test]
fn collect_end_to_end_with_mock_source() {
    let td = tempdir().unwrap();
    let layout = DatedLayout::new(td.path().join("data"));
    let rt = tokio::runtime::Runtime::new().unwrap();

    let first = MockSource::new(vec![
        MockSource::item("Song A", &["Artist X"], "url1"),
        MockSource::item("Song B", &["Artist Y"], "url2"),
    ]);
    let outcome = rt
        .block_on(run_collect(&first, &FsStore, layout.clone(), "pl", day(2024, 7, 1)))
        .unwrap();
    assert!(matches!(outcome, Outcome::SnapshotCreated { tracks: 2, .. }));

    let second = MockSource::new(vec![
        MockSource::item("Song A", &["Artist X"], "url1"),
        MockSource::item("Song C", &["Artist Z", "Artist Q"], "url3"),
    ]);
    let outcome = rt
        .block_on(run_collect(&second, &FsStore, layout.clone(), "pl", day(2024, 7, 2)))
        .unwrap();
    assert!(matches!(outcome, Outcome::DeltaWritten { added: 1, removed: 1, .. }));

    let delta: Delta = serde_json::from_str(
        &std::fs::read_to_string(layout.delta_path(day(2024, 7, 2))).unwrap(),
    )
    .unwrap();
    assert_eq!(delta.added, vec![key("Song C", "Artist Z, Artist Q", "url3")]);
    assert_eq!(delta.removed, vec![key("Song B", "Artist Y", "url2")]);
}

#[test]
fn failed_fetch_writes_nothing() {
    let td = tempdir().unwrap();
    let layout = DatedLayout::new(td.path().join("data"));
    let rt = tokio::runtime::Runtime::new().unwrap();
    let source = MockSource::failing("connection reset");
    let err = rt
        .block_on(run_collect(&source, &FsStore, layout.clone(), "pl", day(2024, 7, 1)))
        .unwrap_err();
    assert!(format!("{:#}", err).contains("connection reset"));
    assert!(!layout.root().exists());
}

#[test]
fn unreadable_snapshot_aborts_without_writing() {
    let store = BrokenStore::new(true);
    let reconciler = Reconciler::new(&store, DatedLayout::new("data"));
    let err = reconciler
        .run(day(2024, 5, 2), &[record("Song A", "Artist X", "url1")])
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<CollectError>(), Some(CollectError::Storage { .. })));
    assert!(store.writes.borrow().is_empty());
}

#[test]
fn failed_snapshot_write_is_storage_error() {
    let store = BrokenStore::new(false);
    let layout = DatedLayout::new("data");
    let reconciler = Reconciler::new(&store, layout.clone());
    let err = reconciler
        .run(day(2024, 5, 1), &[record("Song A", "Artist X", "url1")])
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<CollectError>(), Some(CollectError::Storage { .. })));
    assert_eq!(*store.writes.borrow(), vec![layout.snapshot_path(day(2024, 5, 1))]);
}

#[test]
fn failed_write_leaves_existing_snapshot_untouched() {
    let td = tempdir().unwrap();
    let layout = DatedLayout::new(td.path());
    let reconciler = Reconciler::new(&FsStore, layout.clone());
    reconciler.run(day(2024, 5, 1), &[record("Song A", "Artist X", "url1")]).unwrap();
    let snap = layout.snapshot_path(day(2024, 5, 1));
    let before = std::fs::read_to_string(&snap).unwrap();

    // a directory where the delta file should go makes the final rename fail
    std::fs::create_dir_all(layout.delta_path(day(2024, 5, 2)).join("blocker")).unwrap();
    let err = reconciler
        .run(day(2024, 5, 2), &[record("Song B", "Artist Y", "url2")])
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<CollectError>(), Some(CollectError::Storage { .. })));
    assert_eq!(std::fs::read_to_string(&snap).unwrap(), before);
    // no temp files left next to the snapshot
    let mut names = files_under(&layout.month_dir(day(2024, 5, 2)));
    names.retain(|n| n != "changes_2024-05-02.json");
    assert_eq!(names, vec!["snapshot_2024-05.json"]);
}

//! Copy pipeline driven by injected event/error streams, no watcher involved.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use notify::event::{DataChange, ModifyKind, RemoveKind};
use notify::{Event, EventKind};
use tempfile::TempDir;
use tokio::sync::mpsc;

use copyfiles_core::{CopyFilter, Settings};
use copyfiles_daemon::{CopyPipeline, LogEntry, PipelineLog, Stage};

#[derive(Clone, Default)]
struct RecordingLog(Arc<Mutex<Vec<LogEntry>>>);

impl RecordingLog {
    fn entries(&self) -> Vec<LogEntry> {
        self.0.lock().expect("log lock").clone()
    }
}

impl PipelineLog for RecordingLog {
    fn record(&self, entry: LogEntry) {
        self.0.lock().expect("log lock").push(entry);
    }
}

fn modified(path: &Path) -> Event {
    Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(path.into())
}

fn pipeline(source: &Path, dest: &Path, log: RecordingLog) -> CopyPipeline<RecordingLog> {
    CopyPipeline::new(
        Settings {
            source_dir: source.to_path_buf(),
            dest_dir: dest.to_path_buf(),
            copy_on: CopyFilter::Any,
        },
        log,
    )
}

#[tokio::test]
async fn missing_source_is_logged_and_later_events_still_copy() {
    let src = TempDir::new().expect("src");
    let dst = TempDir::new().expect("dst");
    let gone = src.path().join("gone.txt");
    let present = src.path().join("present.txt");
    fs::write(&present, b"still here").expect("write");

    let log = RecordingLog::default();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (_error_tx, error_rx) = mpsc::unbounded_channel();
    event_tx.send(modified(&gone)).expect("send");
    event_tx
        .send(Event::new(EventKind::Remove(RemoveKind::File)).add_path(gone.clone()))
        .expect("send");
    event_tx.send(modified(&present)).expect("send");
    drop(event_tx);

    pipeline(src.path(), dst.path(), log.clone())
        .run(event_rx, error_rx)
        .await
        .expect("run");

    let open_errors = log
        .entries()
        .into_iter()
        .filter(|e| {
            matches!(e, LogEntry::Error { stage: Stage::Open, path, .. } if path == &gone)
        })
        .count();
    assert_eq!(open_errors, 2, "both events on the missing file log an open error");
    assert!(!dst.path().join("gone.txt").exists());
    assert_eq!(
        fs::read(dst.path().join("present.txt")).expect("read"),
        b"still here"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn read_only_destination_logs_create_error_and_continues() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().expect("src");
    let dst = TempDir::new().expect("dst");
    let file = src.path().join("a.txt");
    fs::write(&file, b"payload").expect("write");
    fs::set_permissions(dst.path(), fs::Permissions::from_mode(0o555)).expect("chmod");

    // Privileged users bypass directory permissions; nothing to observe then.
    if fs::write(dst.path().join("writable-check"), b"").is_ok() {
        return;
    }

    let log = RecordingLog::default();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (_error_tx, error_rx) = mpsc::unbounded_channel();
    event_tx.send(modified(&file)).expect("send");
    event_tx.send(modified(&file)).expect("send");
    drop(event_tx);

    pipeline(src.path(), dst.path(), log.clone())
        .run(event_rx, error_rx)
        .await
        .expect("run");
    fs::set_permissions(dst.path(), fs::Permissions::from_mode(0o755)).expect("chmod back");

    let create_errors = log
        .entries()
        .into_iter()
        .filter(|e| matches!(e, LogEntry::Error { stage: Stage::Create, .. }))
        .count();
    assert_eq!(create_errors, 2);
}

#[tokio::test]
async fn event_with_several_paths_copies_each() {
    let src = TempDir::new().expect("src");
    let dst = TempDir::new().expect("dst");
    let first = src.path().join("one.txt");
    let second = src.path().join("two.txt");
    fs::write(&first, b"1").expect("write");
    fs::write(&second, b"2").expect("write");

    let log = RecordingLog::default();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (_error_tx, error_rx) = mpsc::unbounded_channel();
    event_tx
        .send(
            Event::new(EventKind::Modify(ModifyKind::Any))
                .add_path(first.clone())
                .add_path(second.clone()),
        )
        .expect("send");
    drop(event_tx);

    pipeline(src.path(), dst.path(), log.clone())
        .run(event_rx, error_rx)
        .await
        .expect("run");

    assert_eq!(fs::read(dst.path().join("one.txt")).expect("read"), b"1");
    assert_eq!(fs::read(dst.path().join("two.txt")).expect("read"), b"2");
    let modified_count = log
        .entries()
        .iter()
        .filter(|e| matches!(e, LogEntry::Modified { .. }))
        .count();
    assert_eq!(modified_count, 2);
}

#[tokio::test]
async fn closing_both_streams_returns_ok() {
    let dir = TempDir::new().expect("dir");
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
    let (error_tx, error_rx) = mpsc::unbounded_channel::<notify::Error>();
    let handle = tokio::spawn(
        pipeline(dir.path(), dir.path(), RecordingLog::default()).run(event_rx, error_rx),
    );

    drop(event_tx);
    drop(error_tx);

    handle.await.expect("no panic").expect("clean exit");
}

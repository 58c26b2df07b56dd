use linedupe::orchestrator::{FileOrchestrator, OrchestratorConfig};
use linedupe::reader::stream::{StreamConfig, StreamWatcher};
use linedupe::reader::StopReason;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn quick_follow(max_runtime: Duration) -> StreamConfig {
    StreamConfig::default()
        .with_follow(true)
        .with_poll_interval(Duration::from_millis(20))
        .with_max_runtime(Some(max_runtime))
}

#[test]
fn test_bounded_window_forgets_old_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stream.log");
    fs::write(&path, "A\nB\nC\nA\n").unwrap();

    let orchestrator = FileOrchestrator::new(OrchestratorConfig::default()).unwrap();
    let mut out = Vec::new();
    let report = orchestrator
        .watch(&path, &StreamConfig::default().with_buffer_size(2), &mut out)
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "A\nB\nC\nA\n");
    assert_eq!(report.stats.duplicates_removed, 0);
    assert_eq!(report.stop_reason, StopReason::EndOfFile);
}

#[test]
fn test_window_large_enough_removes_repeat() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stream.log");
    fs::write(&path, "A\nB\nC\nA\n").unwrap();

    let orchestrator = FileOrchestrator::new(OrchestratorConfig::default()).unwrap();
    let mut out = Vec::new();
    let report = orchestrator
        .watch(&path, &StreamConfig::default().with_buffer_size(3), &mut out)
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "A\nB\nC\n");
    assert_eq!(report.stats.duplicates_removed, 1);
}

#[test]
fn test_follow_picks_up_appended_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "start\nstart\n").unwrap();

    let writer_path = path.clone();
    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        let mut file = OpenOptions::new().append(true).open(&writer_path).unwrap();
        file.write_all(b"next\nstart\nlast\n").unwrap();
    });

    let orchestrator = FileOrchestrator::new(OrchestratorConfig::default()).unwrap();
    let mut out = Vec::new();
    let report = orchestrator
        .watch(&path, &quick_follow(Duration::from_millis(800)), &mut out)
        .unwrap();
    writer.join().unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "start\nnext\nlast\n");
    assert_eq!(report.stop_reason, StopReason::Timeout);
    assert_eq!(report.stats.total_lines, 5);
    assert_eq!(report.stats.duplicates_removed, 2);
}

#[test]
fn test_follow_emits_held_fragment_on_stop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "one\npartial").unwrap();

    let mut watcher = StreamWatcher::new(
        &path,
        quick_follow(Duration::from_millis(200)),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    let lines: Vec<String> = watcher
        .by_ref()
        .map(|line| line.unwrap().text)
        .collect();
    assert_eq!(lines, vec!["one", "partial"]);
    assert_eq!(watcher.stop_reason(), Some(StopReason::Timeout));
}

#[test]
fn test_shutdown_flag_stops_follow() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "x\n").unwrap();

    let flag = Arc::new(AtomicBool::new(false));
    let orchestrator = FileOrchestrator::new(
        OrchestratorConfig::default().with_shutdown_flag(Arc::clone(&flag)),
    )
    .unwrap();

    let stopper = {
        let flag = Arc::clone(&flag);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            flag.store(true, Ordering::SeqCst);
        })
    };

    let started = Instant::now();
    let config = StreamConfig::default()
        .with_follow(true)
        .with_poll_interval(Duration::from_millis(20));
    let mut out = Vec::new();
    let report = orchestrator.watch(&path, &config, &mut out).unwrap();
    stopper.join().unwrap();

    assert_eq!(report.stop_reason, StopReason::Shutdown);
    assert_eq!(String::from_utf8(out).unwrap(), "x\n");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_truncated_file_is_read_from_start() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rotating.log");
    fs::write(&path, "first line\nsecond line\n").unwrap();

    let mut watcher = StreamWatcher::new(
        &path,
        quick_follow(Duration::from_secs(5)),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    assert!(watcher.poll().unwrap() > 0);
    assert_eq!(watcher.next_line().unwrap().unwrap().text, "first line");
    assert_eq!(watcher.next_line().unwrap().unwrap().text, "second line");
    assert!(!watcher.has_pending());

    fs::write(&path, "fresh\n").unwrap();
    assert_eq!(watcher.poll().unwrap(), 6);
    assert_eq!(watcher.truncations(), 1);
    assert_eq!(watcher.next_line().unwrap().unwrap().text, "fresh");
    assert_eq!(watcher.offset(), 6);
}

#[test]
fn test_watch_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let orchestrator = FileOrchestrator::new(OrchestratorConfig::default()).unwrap();
    let mut out = Vec::new();
    let result = orchestrator.watch(&dir.path().join("absent.log"), &StreamConfig::default(), &mut out);
    assert!(result.is_err());
    assert!(out.is_empty());
}

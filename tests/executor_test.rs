//! Integration tests for the download executor: probe, transfer and the
//! terminal progress guarantee.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use common::{downloading, finished, MockEngine, RecordingSink};
use grabbot::download::progress::{self, ProgressSnapshot};
use grabbot::download::registry::DownloadTask;
use grabbot::download::{DownloadDirs, DownloadError, DownloadExecutor, Platform};
use grabbot::telegram::MessageHandle;

fn executor(engine: Arc<MockEngine>) -> DownloadExecutor {
    DownloadExecutor::new(engine)
        .with_settle_delay(Duration::ZERO)
        .with_min_emit_interval(Duration::ZERO)
        .with_proxy(None)
}

fn task(dirs: &DownloadDirs, url: &str) -> DownloadTask {
    let (platform, directory) = dirs.classify(url);
    DownloadTask::new(url, platform, directory, Arc::new(RecordingSink::default()), MessageHandle(1))
}

async fn collect(mut rx: mpsc::Receiver<ProgressSnapshot>) -> Vec<ProgressSnapshot> {
    let mut snapshots = Vec::new();
    while let Some(snapshot) = rx.recv().await {
        snapshots.push(snapshot);
    }
    snapshots
}

#[tokio::test]
async fn test_terminal_snapshot_emitted_when_engine_reports_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = DownloadDirs::under(tmp.path());
    dirs.ensure_all().unwrap();

    let engine = Arc::new(MockEngine::new("abc123", Some("Quiet")).writing(128));
    let executor = executor(Arc::clone(&engine));
    let task = task(&dirs, "https://youtu.be/abc123");

    let (tx, rx) = progress::channel();
    let (outcome, snapshots) = tokio::join!(executor.execute(&task, tx), collect(rx));

    assert!(outcome.success);
    assert_eq!(outcome.error, None);
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].is_finished());
    assert_eq!(snapshots[0].completion_fraction, 100.0);
    assert!(outcome.snapshot.is_finished());
    assert_eq!(engine.probe_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_exactly_one_terminal_snapshot_and_it_is_last() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = DownloadDirs::under(tmp.path());
    dirs.ensure_all().unwrap();

    let engine = Arc::new(
        MockEngine::new("1234567890", Some("Clip"))
            .writing(64)
            .with_events(vec![
                downloading(10, Some(100)),
                downloading(60, Some(100)),
                finished(),
                downloading(90, Some(100)),
                finished(),
            ]),
    );
    let executor = executor(Arc::clone(&engine));
    let task = task(&dirs, "https://x.com/user/status/1234567890");
    assert_eq!(task.platform, Platform::X);

    let (tx, rx) = progress::channel();
    let (outcome, snapshots) = tokio::join!(executor.execute(&task, tx), collect(rx));

    assert!(outcome.success);
    let terminal: Vec<_> = snapshots.iter().filter(|s| s.is_finished()).collect();
    assert_eq!(terminal.len(), 1);
    assert!(snapshots.last().unwrap().is_finished());

    let fractions: Vec<f64> = snapshots.iter().map(|s| s.completion_fraction).collect();
    assert_eq!(fractions, vec![10.0, 60.0, 100.0]);

    // X files are named after the post id
    let expected = dirs.platform_dir(Platform::X).join("1234567890.mp4");
    assert_eq!(outcome.snapshot.terminal_output_path, Some(expected.clone()));
    assert_eq!(
        engine.templates.lock().unwrap().clone(),
        vec![dirs.platform_dir(Platform::X).join("%(id)s.%(ext)s").to_string_lossy().to_string()]
    );
    assert!(expected.exists());
}

#[tokio::test]
async fn test_probe_failure_skips_transfer() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = DownloadDirs::under(tmp.path());

    let engine = Arc::new(MockEngine::failing_probe("ERROR: Video unavailable"));
    let executor = executor(Arc::clone(&engine));
    let task = task(&dirs, "https://www.youtube.com/watch?v=gone");

    let (tx, rx) = progress::channel();
    let (outcome, snapshots) = tokio::join!(executor.execute(&task, tx), collect(rx));

    assert!(!outcome.success);
    assert_eq!(
        outcome.error,
        Some(DownloadError::ProbeFailure("ERROR: Video unavailable".to_string()))
    );
    assert_eq!(outcome.probed, None);
    assert!(snapshots.is_empty());
    assert_eq!(engine.retrieve_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transfer_failure_reports_engine_message() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = DownloadDirs::under(tmp.path());
    dirs.ensure_all().unwrap();

    let engine = Arc::new(
        MockEngine::new("BV1xx", Some("Clip"))
            .with_events(vec![downloading(5, Some(100))])
            .with_transfer_error("HTTP Error 403: Forbidden"),
    );
    let executor = executor(Arc::clone(&engine));
    let task = task(&dirs, "https://www.bilibili.com/video/BV1xx");

    let (tx, rx) = progress::channel();
    let (outcome, snapshots) = tokio::join!(executor.execute(&task, tx), collect(rx));

    assert!(!outcome.success);
    assert_eq!(
        outcome.error,
        Some(DownloadError::TransferFailure("HTTP Error 403: Forbidden".to_string()))
    );
    assert!(outcome.probed.is_some());
    assert!(snapshots.iter().all(|s| !s.is_finished()));
}

#[tokio::test]
async fn test_bounded_executor_runs_tasks_one_at_a_time() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = DownloadDirs::under(tmp.path());
    dirs.ensure_all().unwrap();

    let engine = Arc::new(MockEngine::new("abc", Some("Same")).writing(8));
    let executor = Arc::new(executor(Arc::clone(&engine)).with_max_concurrent(1));

    let mut handles = Vec::new();
    for _ in 0..3 {
        let executor = Arc::clone(&executor);
        let task = task(&dirs, "https://youtu.be/abc");
        handles.push(tokio::spawn(async move {
            let (tx, rx) = progress::channel();
            let (outcome, _) = tokio::join!(executor.execute(&task, tx), collect(rx));
            outcome.success
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }
    assert_eq!(engine.retrieve_calls.load(Ordering::SeqCst), 3);
}

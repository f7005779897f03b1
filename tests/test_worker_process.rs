//! Integration test: worker process lifecycle, event stream, cancellation

use autoregress::config::EngineConfig;
use autoregress::worker::{TrainEvent, TrainRequest, WorkerHandle};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

const WORKER_EXE: &str = env!("CARGO_BIN_EXE_autoregress");

fn write_csv(path: &Path, rows: usize) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "a,b,c,y").unwrap();
    for i in 0..rows {
        let a = i as f64;
        let b = ((i * 13) % rows) as f64;
        let c = ((i * 7) % 11) as f64;
        let y = 1.5 * a - 0.5 * b + 2.0 * c + 10.0;
        writeln!(file, "{a},{b},{c},{y}").unwrap();
    }
}

fn request(dir: &Path, rows: usize) -> TrainRequest {
    let csv = dir.join("data.csv");
    write_csv(&csv, rows);
    TrainRequest::new(csv, "y")
        .with_config(EngineConfig::default().with_runs_root(dir.join("runs")))
}

fn terminal_count(events: &[TrainEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

#[test]
fn test_worker_completes_with_single_terminal_event() {
    let tmp = tempfile::tempdir().unwrap();
    let handle = WorkerHandle::spawn_with_exe(&request(tmp.path(), 120), WORKER_EXE).unwrap();

    let events = handle.wait_events();
    assert!(!events.is_empty());

    // Exactly one terminal event, and it is the last one
    assert_eq!(terminal_count(&events), 1);
    let last = events.last().unwrap();
    assert!(matches!(last, TrainEvent::Completed { .. }));

    // Incremental per-model results arrived before the terminal event
    let n_results = events
        .iter()
        .filter(|e| matches!(e, TrainEvent::ModelResult { .. }))
        .count();
    assert_eq!(n_results, 5);

    // The published run directory exists
    if let TrainEvent::Completed { run_dir, .. } = last {
        assert!(run_dir.join("metrics.json").exists());
    }
}

#[test]
fn test_worker_failure_is_a_failed_event_not_a_crash() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = tmp.path().join("bad.csv");
    let mut file = std::fs::File::create(&csv).unwrap();
    writeln!(file, "x,label").unwrap();
    for _ in 0..20 {
        writeln!(file, "1.0,oops").unwrap();
    }
    drop(file);

    let req = TrainRequest::new(csv, "label")
        .with_config(EngineConfig::default().with_runs_root(tmp.path().join("runs")));
    let handle = WorkerHandle::spawn_with_exe(&req, WORKER_EXE).unwrap();

    let events = handle.wait_events();
    assert_eq!(terminal_count(&events), 1);
    match events.last().unwrap() {
        TrainEvent::Failed { kind, message } => {
            assert_eq!(kind, "invalid_target");
            assert!(message.contains("label"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn test_cancel_mid_run_yields_exactly_one_cancelled() {
    let tmp = tempfile::tempdir().unwrap();
    // Large enough that training cannot finish before the kill lands
    let handle = WorkerHandle::spawn_with_exe(&request(tmp.path(), 4000), WORKER_EXE).unwrap();

    // Wait for the stream to start, then cancel
    let first = handle.recv_timeout(Duration::from_secs(30));
    assert!(first.is_some());
    handle.cancel();

    let mut events = vec![first.unwrap()];
    events.extend(handle.wait_events());

    assert_eq!(terminal_count(&events), 1);
    assert!(matches!(events.last().unwrap(), TrainEvent::Cancelled));
    assert!(!events
        .iter()
        .any(|e| matches!(e, TrainEvent::Completed { .. })));
}

#[test]
fn test_cancel_after_completion_is_a_noop() {
    let tmp = tempfile::tempdir().unwrap();
    let handle = WorkerHandle::spawn_with_exe(&request(tmp.path(), 80), WORKER_EXE).unwrap();

    let events = handle.wait_events();
    assert!(matches!(
        events.last().unwrap(),
        TrainEvent::Completed { .. }
    ));

    // Cancelling a finished run produces no further events
    handle.cancel();
    handle.cancel();
    std::thread::sleep(Duration::from_millis(200));
    assert!(handle.try_recv().is_none());
}

#[test]
fn test_cancel_is_idempotent_mid_run() {
    let tmp = tempfile::tempdir().unwrap();
    let handle = WorkerHandle::spawn_with_exe(&request(tmp.path(), 4000), WORKER_EXE).unwrap();

    assert!(handle.recv_timeout(Duration::from_secs(30)).is_some());
    handle.cancel();
    handle.cancel();
    handle.cancel();

    let events = handle.wait_events();
    assert_eq!(terminal_count(&events), 1);
    assert!(matches!(events.last().unwrap(), TrainEvent::Cancelled));
}

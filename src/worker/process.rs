//! Controller-side worker process handle
//!
//! The worker runs as a separate OS process; the handle reads its
//! line-buffered JSON event stream from a background thread and forwards
//! events through a channel, so the controller polls without ever
//! blocking on the worker. Cancellation is unconditional process
//! termination.
//!
//! Terminal-event arbitration: if the child's stream already carried a
//! terminal event, that event wins; otherwise a requested cancellation
//! yields exactly one `Cancelled`, and an abnormal exit yields exactly one
//! `Failed`. A stream never ends with zero or two terminal events.

use super::event::TrainEvent;
use super::request::TrainRequest;
use crate::error::{AutoRegressError, Result};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Handle to a running (or finished) worker process
pub struct WorkerHandle {
    events: Receiver<TrainEvent>,
    child: Arc<Mutex<Child>>,
    cancel_requested: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    // Keeps the serialized request alive for the child's lifetime
    _request_file: tempfile::NamedTempFile,
}

impl WorkerHandle {
    /// Spawn a worker running this same executable's hidden `worker`
    /// subcommand.
    pub fn spawn(request: &TrainRequest) -> Result<Self> {
        let exe = std::env::current_exe()?;
        Self::spawn_with_exe(request, exe)
    }

    /// Spawn a worker from an explicit executable path (used by tests,
    /// where `current_exe` is the test harness rather than the CLI).
    pub fn spawn_with_exe(request: &TrainRequest, exe: impl Into<PathBuf>) -> Result<Self> {
        let request_file = tempfile::Builder::new()
            .prefix("train_request_")
            .suffix(".json")
            .tempfile()?;
        request.save(request_file.path())?;

        tracing::debug!(
            "spawning worker for {} (target: {})",
            request.csv_path.display(),
            request.target
        );

        let mut child = Command::new(exe.into())
            .arg("worker")
            .arg("--request")
            .arg(request_file.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| AutoRegressError::WorkerCrash(format!("failed to spawn worker: {e}")))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            AutoRegressError::WorkerCrash("worker stdout was not captured".to_string())
        })?;

        let child = Arc::new(Mutex::new(child));
        let cancel_requested = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let reader = {
            let child = Arc::clone(&child);
            let cancel_requested = Arc::clone(&cancel_requested);
            std::thread::spawn(move || read_event_stream(stdout, child, cancel_requested, tx))
        };

        Ok(Self {
            events: rx,
            child,
            cancel_requested,
            reader: Some(reader),
            _request_file: request_file,
        })
    }

    /// Receive the next event, blocking up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<TrainEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Non-blocking poll for the next event.
    pub fn try_recv(&self) -> Option<TrainEvent> {
        self.events.try_recv().ok()
    }

    /// Block until the stream's terminal event, collecting everything.
    pub fn wait_events(&self) -> Vec<TrainEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.recv() {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    /// Request cancellation: kill the worker process.
    ///
    /// Idempotent; cancelling an already-finished or already-cancelled run
    /// is a no-op, and a terminal event that already landed wins the race.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
        if let Ok(mut child) = self.child.lock() {
            tracing::debug!("killing worker process");
            let _ = child.kill();
        }
    }

    /// Whether the worker process has exited
    pub fn is_finished(&self) -> bool {
        match self.child.lock() {
            Ok(mut child) => matches!(child.try_wait(), Ok(Some(_))),
            Err(_) => true,
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // Never leave an orphaned compute process behind
        self.cancel();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

fn read_event_stream(
    stdout: std::process::ChildStdout,
    child: Arc<Mutex<Child>>,
    cancel_requested: Arc<AtomicBool>,
    tx: Sender<TrainEvent>,
) {
    let reader = BufReader::new(stdout);
    let mut terminal_seen = false;

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<TrainEvent>(&line) {
            Ok(event) => {
                let terminal = event.is_terminal();
                if terminal && terminal_seen {
                    continue;
                }
                if terminal {
                    terminal_seen = true;
                }
                if tx.send(event).is_err() {
                    return;
                }
                if terminal {
                    break;
                }
            }
            // Stray non-JSON output on stdout is dropped; diagnostics
            // belong on stderr
            Err(_) => continue,
        }
    }

    // Reap the child before deciding how the stream ends
    let status = child.lock().ok().and_then(|mut c| c.wait().ok());

    if !terminal_seen {
        let event = if cancel_requested.load(Ordering::SeqCst) {
            TrainEvent::Cancelled
        } else {
            TrainEvent::Failed {
                kind: "worker_crash".to_string(),
                message: match status {
                    Some(s) => format!("worker exited ({s}) without a terminal event"),
                    None => "worker exited without a terminal event".to_string(),
                },
            }
        };
        let _ = tx.send(event);
    }
}

/// Owns at most one active worker per controller session.
///
/// Starting a new run while one is active first cancels the prior one and
/// drains its stream; concurrent runs are disallowed so the cache's
/// per-run-id invariant stays simple.
pub struct RunController {
    active: Option<WorkerHandle>,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RunController {
    pub fn new() -> Self {
        Self { active: None }
    }

    /// Start a run, cancelling any prior active run first
    pub fn start(&mut self, request: &TrainRequest) -> Result<&WorkerHandle> {
        self.cancel_active();
        let handle = WorkerHandle::spawn(request)?;
        Ok(&*self.active.insert(handle))
    }

    /// Start a run from an explicit worker executable
    pub fn start_with_exe(
        &mut self,
        request: &TrainRequest,
        exe: impl Into<PathBuf>,
    ) -> Result<&WorkerHandle> {
        self.cancel_active();
        let handle = WorkerHandle::spawn_with_exe(request, exe)?;
        Ok(&*self.active.insert(handle))
    }

    /// The current run's handle, if any
    pub fn active(&self) -> Option<&WorkerHandle> {
        self.active.as_ref()
    }

    /// Cancel and forget the active run, if any
    pub fn cancel_active(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
            // Drain so the terminal event is observed before dropping
            let _ = handle.wait_events();
        }
    }
}

//! Run worker
//!
//! Executes a full training run in an isolated child process so a hung or
//! crashing numerical routine can never freeze the controller, and
//! cancellation is unconditional process termination rather than
//! cooperative checkpointing. Progress flows back as a line-buffered
//! JSON event stream terminated by exactly one terminal event.

mod event;
mod process;
mod request;
mod runner;

pub use event::{EventSink, LogLevel, MemorySink, Stage, StdoutSink, TrainEvent};
pub use process::{RunController, WorkerHandle};
pub use request::TrainRequest;
pub use runner::{execute, run_worker, RunSummary};

//! Worker event stream types

use crate::training::Metrics;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

/// Log severity carried by `TrainEvent::Log`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

/// Coarse run stages reported through `TrainEvent::Progress`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Schema,
    Preprocess,
    Train,
    Plots,
    Publish,
}

/// One event on the worker → controller stream.
///
/// Events are delivered in emission order. `Log` may interleave with any
/// other variant; a stream always ends with exactly one terminal event
/// (`Completed`, `Failed`, or `Cancelled`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrainEvent {
    Log {
        level: LogLevel,
        message: String,
        timestamp: String,
    },
    Progress {
        stage: Stage,
        fraction: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        eta_seconds: Option<f64>,
    },
    ModelResult {
        model: String,
        metrics: Metrics,
        seconds: f64,
    },
    Completed {
        winner: String,
        run_id: String,
        run_dir: PathBuf,
    },
    Failed {
        kind: String,
        message: String,
    },
    Cancelled,
}

impl TrainEvent {
    /// Construct a log event stamped with the current time
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether this event terminates the stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Cancelled
        )
    }
}

/// Consumer of the in-worker event stream
pub trait EventSink {
    fn emit(&mut self, event: TrainEvent);
}

/// JSON-lines sink on stdout, flushed per event so the controller sees
/// progress live rather than batched at exit
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&mut self, event: TrainEvent) {
        if let Ok(line) = serde_json::to_string(&event) {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            let _ = writeln!(lock, "{line}");
            let _ = lock.flush();
        }
    }
}

/// In-memory sink for tests and same-process execution
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<TrainEvent>,
}

impl EventSink for MemorySink {
    fn emit(&mut self, event: TrainEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_roundtrip() {
        let events = vec![
            TrainEvent::log(LogLevel::Info, "loading dataset"),
            TrainEvent::Progress {
                stage: Stage::Train,
                fraction: 0.5,
                eta_seconds: Some(12.0),
            },
            TrainEvent::ModelResult {
                model: "ridge".to_string(),
                metrics: Metrics {
                    r2: 0.9,
                    mae: 1.0,
                    rmse: 1.4,
                },
                seconds: 0.2,
            },
            TrainEvent::Completed {
                winner: "ridge".to_string(),
                run_id: "20240101_000000_abcd1234".to_string(),
                run_dir: PathBuf::from("/tmp/runs/x"),
            },
            TrainEvent::Cancelled,
        ];

        for event in events {
            let line = serde_json::to_string(&event).unwrap();
            let back: TrainEvent = serde_json::from_str(&line).unwrap();
            assert_eq!(back, event);
        }
    }

    #[test]
    fn test_tagged_wire_format() {
        let line =
            serde_json::to_string(&TrainEvent::Failed {
                kind: "invalid_target".to_string(),
                message: "boom".to_string(),
            })
            .unwrap();
        assert!(line.contains("\"event\":\"failed\""));
        assert!(line.contains("\"kind\":\"invalid_target\""));
    }

    #[test]
    fn test_terminal_classification() {
        assert!(TrainEvent::Cancelled.is_terminal());
        assert!(TrainEvent::Failed {
            kind: "data".into(),
            message: String::new()
        }
        .is_terminal());
        assert!(!TrainEvent::log(LogLevel::Warn, "x").is_terminal());
    }
}

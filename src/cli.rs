//! Command-line interface
//!
//! The controller side of the system: `train` drives a worker process and
//! renders its live event stream; `export`, `evaluate`, and `runs` operate
//! on the run cache and exported bundles. The hidden `worker` subcommand
//! is the isolated worker entry point.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::RunCache;
use crate::config::EngineConfig;
use crate::error::{AutoRegressError, Result};
use crate::evaluate::{EvalOptions, EvaluationLoader};
use crate::export::export_run;
use crate::training::ModelKind;
use crate::worker::{LogLevel, RunController, TrainEvent, TrainRequest};

#[derive(Parser)]
#[command(
    name = "autoregress",
    version,
    about = "Automated regression model selection over CSV data"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train all candidate models on a CSV and cache the best one
    Train {
        /// Path to the training CSV
        #[arg(long)]
        csv: PathBuf,
        /// Name of the numeric target column
        #[arg(long)]
        target: String,
        /// Run seed for the hold-out split and seeded estimators
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Comma-separated candidate subset (default: all five)
        #[arg(long)]
        models: Option<String>,
        /// Override the run cache root directory
        #[arg(long)]
        runs_root: Option<PathBuf>,
    },

    /// Export a cached run as a reusable bundle
    Export {
        /// Run id (see `runs`)
        #[arg(long)]
        run: String,
        /// Destination directory for the bundle
        #[arg(long)]
        dest: PathBuf,
        /// Override the run cache root directory
        #[arg(long)]
        runs_root: Option<PathBuf>,
    },

    /// Score a new CSV against an exported bundle
    Evaluate {
        /// Exported bundle directory
        #[arg(long)]
        bundle: PathBuf,
        /// CSV to score
        #[arg(long)]
        csv: PathBuf,
        /// Where to write metrics, predictions, and plots
        #[arg(long)]
        out: Option<PathBuf>,
        /// Maximum rows evaluated per invocation
        #[arg(long, default_value_t = 100)]
        max_rows: usize,
    },

    /// List cached runs
    Runs {
        /// Override the run cache root directory
        #[arg(long)]
        runs_root: Option<PathBuf>,
    },

    /// Isolated worker entry point (spawned by `train`)
    #[command(hide = true)]
    Worker {
        /// Serialized TrainRequest JSON
        #[arg(long)]
        request: PathBuf,
    },
}

fn dim(s: &str) -> ColoredString {
    s.truecolor(120, 120, 120)
}

fn level_tag(level: LogLevel) -> ColoredString {
    match level {
        LogLevel::Info => "info".normal(),
        LogLevel::Warn => "warn".yellow(),
        LogLevel::Error => "error".red(),
        LogLevel::Success => "ok".green(),
    }
}

fn parse_candidates(models: &Option<String>) -> Result<Option<Vec<ModelKind>>> {
    let Some(spec) = models else {
        return Ok(None);
    };
    let mut kinds = Vec::new();
    for name in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind = ModelKind::parse(name).ok_or_else(|| {
            AutoRegressError::ValidationError(format!(
                "unknown model '{name}' (expected one of: linear, ridge, random_forest, svr, knn)"
            ))
        })?;
        kinds.push(kind);
    }
    if kinds.is_empty() {
        return Err(AutoRegressError::ValidationError(
            "empty model list".to_string(),
        ));
    }
    Ok(Some(kinds))
}

/// Run a training job and render its live event stream
pub fn cmd_train(
    csv: &PathBuf,
    target: &str,
    seed: u64,
    models: &Option<String>,
    runs_root: &Option<PathBuf>,
) -> Result<()> {
    let mut config = EngineConfig::default().with_seed(seed);
    if let Some(root) = runs_root {
        config = config.with_runs_root(root.clone());
    }

    let mut request = TrainRequest::new(csv.clone(), target).with_config(config);
    if let Some(candidates) = parse_candidates(models)? {
        request = request.with_candidates(candidates);
    }

    println!(
        "  training on {} (target: {})",
        csv.display().to_string().white().bold(),
        target.white().bold()
    );

    let mut controller = RunController::new();
    let handle = controller.start(&request)?;

    loop {
        let Some(event) = handle.recv_timeout(Duration::from_secs(3600)) else {
            return Err(AutoRegressError::WorkerCrash(
                "event stream ended unexpectedly".to_string(),
            ));
        };

        match event {
            TrainEvent::Log { level, message, .. } => {
                println!("  {} {}", level_tag(level), message);
            }
            TrainEvent::Progress { stage, fraction, .. } => {
                println!(
                    "  {} {:?} {}",
                    dim("·"),
                    stage,
                    dim(&format!("{:.0}%", fraction * 100.0))
                );
            }
            TrainEvent::ModelResult {
                model,
                metrics,
                seconds,
            } => {
                println!(
                    "  {} {:<14} R²={:<8.4} MAE={:<10.4} RMSE={:<10.4} {}",
                    "✓".green(),
                    model,
                    metrics.r2,
                    metrics.mae,
                    metrics.rmse,
                    dim(&format!("{seconds:.2}s"))
                );
            }
            TrainEvent::Completed {
                winner,
                run_id,
                run_dir,
            } => {
                println!();
                println!("  {} winner: {}", "✓".green(), winner.white().bold());
                println!("  {} run id: {run_id}", dim("·"));
                println!("  {} cached at: {}", dim("·"), run_dir.display());
                return Ok(());
            }
            TrainEvent::Failed { kind, message } => {
                println!("  {} [{kind}] {message}", "✗".red());
                return Err(AutoRegressError::WorkerCrash(message));
            }
            TrainEvent::Cancelled => {
                println!("  {} run cancelled", "✗".yellow());
                return Ok(());
            }
        }
    }
}

/// Export a cached run to a destination directory
pub fn cmd_export(run: &str, dest: &PathBuf, runs_root: &Option<PathBuf>) -> Result<()> {
    let cache = open_cache(runs_root)?;
    let out = export_run(&cache, run, dest)?;
    println!("  {} exported {run} to {}", "✓".green(), out.display());
    Ok(())
}

/// Evaluate a new CSV against an exported bundle
pub fn cmd_evaluate(
    bundle: &PathBuf,
    csv: &PathBuf,
    out: &Option<PathBuf>,
    max_rows: usize,
) -> Result<()> {
    let loader = EvaluationLoader::load(bundle)?;
    println!(
        "  evaluating {} with {} (winner: {})",
        csv.display(),
        bundle.display(),
        loader.winner().white().bold()
    );

    let options = EvalOptions {
        max_rows,
        out_dir: out.clone(),
    };
    let report = loader.evaluate(csv, &options)?;

    for warning in &report.warnings {
        println!("  {} {}", level_tag(LogLevel::Warn), warning);
    }

    println!("  {} scored {} rows", "✓".green(), report.n_rows);
    match report.metrics {
        Some(m) => println!(
            "  R²={:.4}  MAE={:.4}  RMSE={:.4}",
            m.r2, m.mae, m.rmse
        ),
        None => println!("  {} (no target column; predictions only)", dim("·")),
    }
    if let Some(dir) = out {
        println!("  {} outputs written to {}", dim("·"), dir.display());
    }
    Ok(())
}

/// List cached runs with their winners
pub fn cmd_runs(runs_root: &Option<PathBuf>) -> Result<()> {
    let cache = open_cache(runs_root)?;
    let runs = cache.list()?;

    if runs.is_empty() {
        println!("  no cached runs under {}", cache.root().display());
        return Ok(());
    }

    for run_id in runs {
        match cache.read(&run_id) {
            Ok(artifact) => println!(
                "  {run_id}  {} {}",
                artifact.metrics.winner.white().bold(),
                dim(&format!("R²={:.4}", artifact.metrics.best_r2))
            ),
            Err(_) => println!("  {run_id}  {}", dim("(unreadable)")),
        }
    }
    Ok(())
}

fn open_cache(runs_root: &Option<PathBuf>) -> Result<RunCache> {
    let mut config = EngineConfig::default();
    if let Some(root) = runs_root {
        config = config.with_runs_root(root.clone());
    }
    RunCache::open(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidates() {
        let parsed = parse_candidates(&Some("linear, knn".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(parsed, vec![ModelKind::Linear, ModelKind::Knn]);

        assert!(parse_candidates(&Some("gbm".to_string())).is_err());
        assert!(parse_candidates(&None).unwrap().is_none());
    }
}

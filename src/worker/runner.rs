//! In-worker run execution
//!
//! Drives load → schema inference → split → preprocessing → candidate
//! sweep → selection → artifact publication, emitting events throughout.
//! Every failure path resolves to an error the worker entry point converts
//! into a terminal `Failed` event; panics are caught at the process
//! boundary. The controller never sees a crash.

use super::event::{EventSink, LogLevel, Stage, StdoutSink, TrainEvent};
use super::request::TrainRequest;
use crate::bundle::ModelBundle;
use crate::cache::{
    write_predictions, MetricsReport, ModelScore, RunCache, ValPrediction, METRICS_FILE,
    MODEL_FILE, PREDICTIONS_FILE, SCHEMA_FILE,
};
use crate::data::DataLoader;
use crate::error::{AutoRegressError, Result};
use crate::plot;
use crate::preprocessing::Pipeline;
use crate::schema::SchemaInferer;
use crate::training::{holdout_split, select_winner, ModelTrainer};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Summary returned by a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub winner: String,
    pub best_r2: f64,
    pub elapsed_seconds: f64,
}

fn progress(sink: &mut dyn EventSink, stage: Stage, fraction: f64, started: Instant) {
    let eta_seconds = if fraction > 0.0 && fraction < 1.0 {
        let elapsed = started.elapsed().as_secs_f64();
        Some(elapsed * (1.0 - fraction) / fraction)
    } else {
        None
    };
    sink.emit(TrainEvent::Progress {
        stage,
        fraction,
        eta_seconds,
    });
}

fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    df.take(&idx)
        .map_err(|e| AutoRegressError::DataError(e.to_string()))
}

fn target_values(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    let ca = df
        .column(target)
        .map_err(|_| AutoRegressError::FeatureNotFound(target.to_string()))?
        .as_materialized_series()
        .f64()
        .map_err(|e| AutoRegressError::DataError(e.to_string()))?
        .clone();
    Ok(ca.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

/// Execute a training run, emitting events into `sink`.
///
/// Artifacts are written into a staging directory of the run cache and
/// published atomically right before this returns, so a reader never sees
/// a partial run.
pub fn execute(request: &TrainRequest, sink: &mut dyn EventSink) -> Result<RunSummary> {
    let started = Instant::now();

    if request.candidates.is_empty() {
        return Err(AutoRegressError::ValidationError(
            "candidate list is empty".to_string(),
        ));
    }

    sink.emit(TrainEvent::log(LogLevel::Info, "loading dataset"));
    let df = DataLoader::new().load_csv(&request.csv_path)?;
    progress(sink, Stage::Load, 0.05, started);

    let inferred = SchemaInferer::new(&request.config).infer(&df, &request.target)?;
    for warning in &inferred.warnings {
        sink.emit(TrainEvent::log(LogLevel::Warn, warning.clone()));
    }
    let schema = inferred.schema.clone();
    sink.emit(TrainEvent::log(
        LogLevel::Info,
        format!(
            "features: {} columns (numeric={}, categorical={})",
            schema.features.len(),
            schema.numeric_features().len(),
            schema.features.len() - schema.numeric_features().len(),
        ),
    ));
    progress(sink, Stage::Schema, 0.1, started);

    sink.emit(TrainEvent::log(
        LogLevel::Info,
        format!(
            "splitting data (validation_split={:.2}, seed={})",
            request.config.validation_split, request.config.seed
        ),
    ));
    let (train_idx, val_idx) = holdout_split(
        inferred.df.height(),
        request.config.validation_split,
        request.config.seed,
    )?;
    let df_train = take_rows(&inferred.df, &train_idx)?;
    let df_val = take_rows(&inferred.df, &val_idx)?;
    let y_train = target_values(&df_train, &request.target)?;
    let y_val = target_values(&df_val, &request.target)?;

    let mut pipeline = Pipeline::from_schema(&schema);
    pipeline.fit(&df_train)?;

    let x_raw_train = pipeline.transform(&df_train, false)?;
    let x_raw_val = pipeline.transform(&df_val, false)?;
    let needs_scaled = request.candidates.iter().any(|k| k.needs_scaling());
    let (x_scaled_train, x_scaled_val) = if needs_scaled {
        (
            pipeline.transform(&df_train, true)?,
            pipeline.transform(&df_val, true)?,
        )
    } else {
        (x_raw_train.clone(), x_raw_val.clone())
    };
    progress(sink, Stage::Preprocess, 0.2, started);

    let trainer = ModelTrainer::new(request.candidates.clone(), request.config.seed);
    let n_candidates = request.candidates.len();
    let mut completed = 0usize;
    let report = trainer.run(
        &x_raw_train,
        &x_raw_val,
        &x_scaled_train,
        &x_scaled_val,
        &y_train,
        &y_val,
        |candidate| {
            completed += 1;
            sink.emit(TrainEvent::log(
                LogLevel::Info,
                format!("trained {}", candidate.kind.name()),
            ));
            sink.emit(TrainEvent::ModelResult {
                model: candidate.kind.name().to_string(),
                metrics: candidate.metrics,
                seconds: candidate.seconds,
            });
            progress(
                &mut *sink,
                Stage::Train,
                0.2 + 0.6 * (completed as f64 / n_candidates as f64),
                started,
            );
        },
    )?;

    for (kind, message) in &report.failures {
        sink.emit(TrainEvent::log(
            LogLevel::Error,
            format!("{} failed: {message}", kind.name()),
        ));
    }

    let scored: Vec<_> = report
        .trained
        .iter()
        .map(|c| (c.kind, c.metrics))
        .collect();
    let winner_kind = select_winner(&scored).ok_or(AutoRegressError::AllModelsFailed)?;
    let best = report
        .trained
        .iter()
        .find(|c| c.kind == winner_kind)
        .ok_or(AutoRegressError::AllModelsFailed)?;

    sink.emit(TrainEvent::log(
        LogLevel::Success,
        format!(
            "best model: {} (R²={:.3})",
            winner_kind.name(),
            best.metrics.r2
        ),
    ));

    // Persist the full artifact set into staging, then publish atomically
    let cache = RunCache::open(&request.config)?;
    let run_id = RunCache::generate_run_id();
    let staged = cache.stage(&run_id)?;

    let written = (|| -> Result<()> {
        schema.save(&staged.dir().join(SCHEMA_FILE))?;

        let per_model: BTreeMap<String, ModelScore> = report
            .trained
            .iter()
            .map(|c| {
                (
                    c.kind.name().to_string(),
                    ModelScore {
                        metrics: c.metrics,
                        seconds: c.seconds,
                    },
                )
            })
            .collect();
        let failures: BTreeMap<String, String> = report
            .failures
            .iter()
            .map(|(k, m)| (k.name().to_string(), m.clone()))
            .collect();
        let metrics_report = MetricsReport {
            winner: winner_kind.name().to_string(),
            best_r2: best.metrics.r2,
            per_model,
            failures,
        };
        metrics_report.save(&staged.dir().join(METRICS_FILE))?;

        let predictions: Vec<ValPrediction> = val_idx
            .iter()
            .zip(y_val.iter())
            .zip(best.predictions.iter())
            .map(|((&row, &actual), &predicted)| ValPrediction {
                row,
                actual,
                predicted,
            })
            .collect();
        write_predictions(&staged.dir().join(PREDICTIONS_FILE), &predictions)?;

        let bundle = ModelBundle::new(
            winner_kind.name().to_string(),
            best.model.clone(),
            pipeline.clone(),
        );
        bundle.save(&staged.dir().join(MODEL_FILE))?;
        Ok(())
    })();

    if let Err(e) = written {
        staged.discard();
        return Err(e);
    }

    // Plot failures are warnings, never fatal
    progress(sink, Stage::Plots, 0.9, started);
    let plots_dir = staged.plots_dir();
    let y_val_slice: Vec<f64> = y_val.to_vec();
    let y_pred_slice: Vec<f64> = best.predictions.to_vec();
    let winner_title = format!("Best: {}", winner_kind.name());
    let comparison_scores: BTreeMap<String, ModelScore> = report
        .trained
        .iter()
        .map(|c| {
            (
                c.kind.name().to_string(),
                ModelScore {
                    metrics: c.metrics,
                    seconds: c.seconds,
                },
            )
        })
        .collect();
    let plot_results = [
        plot::render_model_comparison(
            &comparison_scores,
            &plots_dir.join("model_comparison_r2.png"),
        ),
        plot::render_parity(
            &y_val_slice,
            &y_pred_slice,
            &format!("Parity Plot ({winner_title})"),
            &plots_dir.join("best_parity.png"),
        ),
        plot::render_residuals(
            &y_val_slice,
            &y_pred_slice,
            &format!("Residuals vs Predicted ({winner_title})"),
            &plots_dir.join("best_residuals.png"),
        ),
        plot::render_residual_distribution(
            &y_val_slice,
            &y_pred_slice,
            &format!("Residual Distribution ({winner_title})"),
            &plots_dir.join("best_residual_distribution.png"),
        ),
    ];
    for result in plot_results {
        if let Err(e) = result {
            sink.emit(TrainEvent::log(
                LogLevel::Warn,
                format!("plot generation failed: {e}"),
            ));
        }
    }

    progress(sink, Stage::Publish, 0.95, started);
    let run_dir = staged.publish()?;

    let elapsed_seconds = started.elapsed().as_secs_f64();
    sink.emit(TrainEvent::log(
        LogLevel::Info,
        format!("run finished in {elapsed_seconds:.2}s"),
    ));

    Ok(RunSummary {
        run_id,
        run_dir,
        winner: winner_kind.name().to_string(),
        best_r2: best.metrics.r2,
        elapsed_seconds,
    })
}

/// Worker process entry point: load the request, run it, and guarantee a
/// single terminal event on stdout. Returns the process exit code.
pub fn run_worker(request_path: &Path) -> i32 {
    let mut sink = StdoutSink;

    let request = match TrainRequest::load(request_path) {
        Ok(r) => r,
        Err(e) => {
            sink.emit(TrainEvent::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            });
            return 2;
        }
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| execute(&request, &mut sink)));

    match outcome {
        Ok(Ok(summary)) => {
            sink.emit(TrainEvent::Completed {
                winner: summary.winner,
                run_id: summary.run_id,
                run_dir: summary.run_dir,
            });
            0
        }
        Ok(Err(e)) => {
            sink.emit(TrainEvent::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            });
            2
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker panicked".to_string());
            sink.emit(TrainEvent::Failed {
                kind: "worker_crash".to_string(),
                message,
            });
            2
        }
    }
}

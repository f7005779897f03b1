//! Evaluation loader
//!
//! Reloads an exported bundle (frozen schema + fitted pipeline + winning
//! model) and applies it to a new CSV. The preprocessing contract from
//! training is reused exactly — nothing is refit.

use crate::bundle::ModelBundle;
use crate::cache::{MODEL_FILE, PLOTS_DIR, SCHEMA_FILE};
use crate::data::DataLoader;
use crate::error::{AutoRegressError, Result};
use crate::plot;
use crate::schema::{coerce_to_schema, Schema};
use crate::training::Metrics;
use ndarray::Array1;
use polars::prelude::*;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Evaluation options
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Row cap per invocation; excess rows are truncated with a warning
    pub max_rows: usize,
    /// When set, metrics, predictions, and comparison plots are written here
    pub out_dir: Option<PathBuf>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_rows: 100,
            out_dir: None,
        }
    }
}

/// Result of scoring a CSV against an exported bundle
#[derive(Debug, Clone)]
pub struct EvalReport {
    pub predictions: Vec<f64>,
    /// Actual target values, when the target column was present
    pub actuals: Option<Vec<f64>>,
    /// Metrics, when the target column was present
    pub metrics: Option<Metrics>,
    pub n_rows: usize,
    pub truncated: bool,
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
struct EvalSummaryFile<'a> {
    csv_path: &'a str,
    target: &'a str,
    target_present: bool,
    n_rows: usize,
    truncated: bool,
    metrics: Option<Metrics>,
    created_at: String,
}

/// Loads an exported bundle directory and scores new data against it
pub struct EvaluationLoader {
    schema: Schema,
    bundle: ModelBundle,
}

impl EvaluationLoader {
    /// Load `model.json` + `schema.json` from a bundle directory
    pub fn load(bundle_dir: &Path) -> Result<Self> {
        let model_path = bundle_dir.join(MODEL_FILE);
        let schema_path = bundle_dir.join(SCHEMA_FILE);

        if !model_path.exists() || !schema_path.exists() {
            return Err(AutoRegressError::DataError(format!(
                "bundle directory must contain {MODEL_FILE} and {SCHEMA_FILE}: {}",
                bundle_dir.display()
            )));
        }

        Ok(Self {
            schema: Schema::load(&schema_path)?,
            bundle: ModelBundle::load(&model_path)?,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Name of the winning model inside the bundle
    pub fn winner(&self) -> &str {
        &self.bundle.winner
    }

    /// Score a CSV against the bundle.
    ///
    /// Missing required feature columns are fatal (`SchemaMismatch`);
    /// extra columns are ignored with a warning. At most
    /// `options.max_rows` rows are evaluated; excess is truncated with a
    /// reported warning.
    pub fn evaluate(&self, csv_path: &Path, options: &EvalOptions) -> Result<EvalReport> {
        let mut warnings = Vec::new();

        let mut df = DataLoader::new().load_csv(csv_path)?;

        let truncated = df.height() > options.max_rows;
        if truncated {
            warnings.push(format!(
                "dataset has {} rows; evaluating only the first {}",
                df.height(),
                options.max_rows
            ));
            df = df.head(Some(options.max_rows));
        }

        // Validate columns against the frozen schema
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let missing: Vec<String> = self
            .schema
            .feature_names()
            .iter()
            .filter(|f| !present.iter().any(|p| p == *f))
            .map(|f| f.to_string())
            .collect();
        let extra: Vec<String> = present
            .iter()
            .filter(|p| {
                **p != self.schema.target && !self.schema.feature_names().contains(&p.as_str())
            })
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(AutoRegressError::SchemaMismatch { missing, extra });
        }
        if !extra.is_empty() {
            warnings.push(format!("ignoring extra columns: {}", extra.join(", ")));
        }

        let mut coerced = coerce_to_schema(&df, &self.schema)?;

        // When the target is present, rows whose target fails numeric
        // coercion are dropped from scoring, matching training behavior
        let target_present = present.iter().any(|p| *p == self.schema.target);
        let mut actuals: Option<Vec<f64>> = None;
        if target_present {
            let target_series = coerced
                .column(&self.schema.target)
                .map_err(|_| AutoRegressError::FeatureNotFound(self.schema.target.clone()))?
                .as_materialized_series()
                .clone();
            let (numeric, _) = crate::schema::coerce_to_numeric(&target_series)?;
            coerced
                .with_column(numeric.clone())
                .map_err(|e| AutoRegressError::DataError(e.to_string()))?;

            let bad = numeric.null_count();
            if bad > 0 {
                warnings.push(format!(
                    "target has {bad} non-numeric values; dropping those rows"
                ));
                let mask = numeric.is_not_null();
                coerced = coerced
                    .filter(&mask)
                    .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
            }

            let ca = coerced
                .column(&self.schema.target)
                .map_err(|_| AutoRegressError::FeatureNotFound(self.schema.target.clone()))?
                .as_materialized_series()
                .f64()
                .map_err(|e| AutoRegressError::DataError(e.to_string()))?
                .clone();
            actuals = Some(ca.into_iter().map(|v| v.unwrap_or(0.0)).collect());
        }

        let predictions = self.bundle.predict(&coerced)?;
        let pred_vec: Vec<f64> = predictions.to_vec();

        let metrics = actuals.as_ref().map(|a| {
            let y_true = Array1::from_vec(a.clone());
            Metrics::compute(&y_true, &predictions)
        });

        let report = EvalReport {
            predictions: pred_vec,
            actuals,
            metrics,
            n_rows: coerced.height(),
            truncated,
            warnings,
        };

        if let Some(out_dir) = &options.out_dir {
            self.write_outputs(csv_path, out_dir, &report)?;
        }

        Ok(report)
    }

    fn write_outputs(&self, csv_path: &Path, out_dir: &Path, report: &EvalReport) -> Result<()> {
        std::fs::create_dir_all(out_dir)?;

        let csv_display = csv_path.to_string_lossy();
        let summary = EvalSummaryFile {
            csv_path: &csv_display,
            target: &self.schema.target,
            target_present: report.actuals.is_some(),
            n_rows: report.n_rows,
            truncated: report.truncated,
            metrics: report.metrics,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        std::fs::write(
            out_dir.join("eval_metrics.json"),
            serde_json::to_string_pretty(&summary)?,
        )?;

        let mut file = std::fs::File::create(out_dir.join("eval_predictions.csv"))?;
        match &report.actuals {
            Some(actuals) => {
                writeln!(file, "actual,predicted")?;
                for (a, p) in actuals.iter().zip(report.predictions.iter()) {
                    writeln!(file, "{a},{p}")?;
                }
            }
            None => {
                writeln!(file, "predicted")?;
                for p in &report.predictions {
                    writeln!(file, "{p}")?;
                }
            }
        }

        // Plot failures are warnings at most; nothing to report here
        let plots_dir = out_dir.join(PLOTS_DIR);
        let _ = std::fs::create_dir_all(&plots_dir);
        match &report.actuals {
            Some(actuals) => {
                let _ = plot::render_parity(
                    actuals,
                    &report.predictions,
                    "Parity Plot (True vs Predicted)",
                    &plots_dir.join("parity.png"),
                );
                let _ = plot::render_residuals(
                    actuals,
                    &report.predictions,
                    "Residuals vs Predicted",
                    &plots_dir.join("residuals.png"),
                );
                let _ = plot::render_residual_distribution(
                    actuals,
                    &report.predictions,
                    "Residual Distribution",
                    &plots_dir.join("residual_distribution.png"),
                );
                let _ = plot::render_prediction_distribution(
                    &report.predictions,
                    &plots_dir.join("pred_distribution.png"),
                );
            }
            None => {
                let _ = plot::render_prediction_distribution(
                    &report.predictions,
                    &plots_dir.join("pred_distribution.png"),
                );
            }
        }

        Ok(())
    }
}

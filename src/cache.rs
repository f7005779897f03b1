//! Run cache
//!
//! Persists completed run artifacts under a per-run directory so the
//! controller never has to hold fitted models or prediction tables in
//! memory. Publication is atomic: the worker writes into a staging
//! directory and a single rename makes the run visible, so a reader never
//! observes a partially written run. Entries are immutable once published;
//! a new run always gets a new run id.

use crate::bundle::ModelBundle;
use crate::config::EngineConfig;
use crate::error::{AutoRegressError, Result};
use crate::schema::Schema;
use crate::training::Metrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Run directory members
pub const MODEL_FILE: &str = "model.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const SCHEMA_FILE: &str = "schema.json";
pub const PREDICTIONS_FILE: &str = "val_predictions.csv";
pub const PLOTS_DIR: &str = "plots";

const STAGING_DIR: &str = ".staging";

/// Validation metrics for one candidate, as persisted in `metrics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    #[serde(flatten)]
    pub metrics: Metrics,
    /// Wall-clock training time
    pub seconds: f64,
}

/// Contents of `metrics.json`: every candidate's scores plus the declared
/// winner and any per-candidate failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub winner: String,
    pub best_r2: f64,
    pub per_model: BTreeMap<String, ModelScore>,
    #[serde(default)]
    pub failures: BTreeMap<String, String>,
}

impl MetricsReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// One row of `val_predictions.csv`: the original dataset row index with
/// the actual and predicted target values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValPrediction {
    pub row: usize,
    pub actual: f64,
    pub predicted: f64,
}

/// Write validation predictions as CSV
pub fn write_predictions(path: &Path, predictions: &[ValPrediction]) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "row,actual,predicted")?;
    for p in predictions {
        writeln!(file, "{},{},{}", p.row, p.actual, p.predicted)?;
    }
    Ok(())
}

/// Read validation predictions back from CSV
pub fn read_predictions(path: &Path) -> Result<Vec<ValPrediction>> {
    let content = std::fs::read_to_string(path)?;
    let mut result = Vec::new();

    for (i, line) in content.lines().enumerate() {
        if i == 0 || line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != 3 {
            return Err(AutoRegressError::DataError(format!(
                "malformed prediction row: {line}"
            )));
        }
        let parse = |s: &str| -> Result<f64> {
            s.trim()
                .parse::<f64>()
                .map_err(|e| AutoRegressError::DataError(format!("bad number '{s}': {e}")))
        };
        result.push(ValPrediction {
            row: parts[0]
                .trim()
                .parse::<usize>()
                .map_err(|e| AutoRegressError::DataError(format!("bad row index: {e}")))?,
            actual: parse(parts[1])?,
            predicted: parse(parts[2])?,
        });
    }

    Ok(result)
}

/// A completed run's cached output, reloaded from its directory
#[derive(Debug)]
pub struct RunArtifact {
    pub run_id: String,
    pub dir: PathBuf,
    pub bundle: ModelBundle,
    pub schema: Schema,
    pub metrics: MetricsReport,
    pub predictions: Vec<ValPrediction>,
    pub plots: Vec<PathBuf>,
}

/// A run directory being written, not yet visible to readers
#[derive(Debug)]
pub struct StagedRun {
    run_id: String,
    staging: PathBuf,
    final_dir: PathBuf,
}

impl StagedRun {
    /// Directory to write artifacts into
    pub fn dir(&self) -> &Path {
        &self.staging
    }

    /// Plots subdirectory (already created)
    pub fn plots_dir(&self) -> PathBuf {
        self.staging.join(PLOTS_DIR)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Atomically publish the staged directory as the run directory
    pub fn publish(self) -> Result<PathBuf> {
        if self.final_dir.exists() {
            return Err(AutoRegressError::ValidationError(format!(
                "run '{}' already published",
                self.run_id
            )));
        }
        std::fs::rename(&self.staging, &self.final_dir)?;
        tracing::debug!("published run {} at {}", self.run_id, self.final_dir.display());
        Ok(self.final_dir)
    }

    /// Throw away the staged output
    pub fn discard(self) {
        let _ = std::fs::remove_dir_all(&self.staging);
    }
}

/// Per-run-id directory store with atomic publish
#[derive(Debug, Clone)]
pub struct RunCache {
    root: PathBuf,
}

impl RunCache {
    /// Open (creating if needed) the cache for the given configuration
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let root = match &config.runs_root {
            Some(path) => path.clone(),
            None => default_runs_root()?,
        };
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Open a cache at an explicit root
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Timestamped run id with a short unique suffix
    pub fn generate_run_id() -> String {
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let suffix: String = uuid::Uuid::new_v4().to_string()[..8].to_string();
        format!("{stamp}_{suffix}")
    }

    /// Directory of a published run
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }

    /// Whether a run has been published
    pub fn contains(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(METRICS_FILE).exists()
    }

    /// Create a staging directory for a new run, with its plots subdir
    pub fn stage(&self, run_id: &str) -> Result<StagedRun> {
        let staging = self.root.join(STAGING_DIR).join(run_id);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(staging.join(PLOTS_DIR))?;

        Ok(StagedRun {
            run_id: run_id.to_string(),
            staging,
            final_dir: self.run_dir(run_id),
        })
    }

    /// Load a published run's artifact set
    pub fn read(&self, run_id: &str) -> Result<RunArtifact> {
        let dir = self.run_dir(run_id);
        if !self.contains(run_id) {
            return Err(AutoRegressError::RunNotFound(run_id.to_string()));
        }
        read_artifact_dir(run_id, &dir)
    }

    /// Published run ids, newest first
    pub fn list(&self) -> Result<Vec<String>> {
        let mut runs = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name == STAGING_DIR {
                continue;
            }
            if entry.path().join(METRICS_FILE).exists() {
                runs.push(name);
            }
        }
        runs.sort();
        runs.reverse();
        Ok(runs)
    }

    /// Remove a published run
    pub fn prune(&self, run_id: &str) -> Result<()> {
        let dir = self.run_dir(run_id);
        if !dir.exists() {
            return Err(AutoRegressError::RunNotFound(run_id.to_string()));
        }
        std::fs::remove_dir_all(dir)?;
        Ok(())
    }
}

/// Load an artifact set from any directory with the run layout
/// (used by both the cache and the evaluation loader on exported bundles)
pub fn read_artifact_dir(run_id: &str, dir: &Path) -> Result<RunArtifact> {
    let bundle = ModelBundle::load(&dir.join(MODEL_FILE))?;
    let schema = Schema::load(&dir.join(SCHEMA_FILE))?;
    let metrics = MetricsReport::load(&dir.join(METRICS_FILE))?;
    let predictions = read_predictions(&dir.join(PREDICTIONS_FILE))?;

    let mut plots = Vec::new();
    let plots_dir = dir.join(PLOTS_DIR);
    if plots_dir.is_dir() {
        for entry in std::fs::read_dir(&plots_dir)? {
            plots.push(entry?.path());
        }
        plots.sort();
    }

    Ok(RunArtifact {
        run_id: run_id.to_string(),
        dir: dir.to_path_buf(),
        bundle,
        schema,
        metrics,
        predictions,
        plots,
    })
}

fn default_runs_root() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        AutoRegressError::ValidationError("cannot determine home directory".to_string())
    })?;
    Ok(home.join(".autoregress").join("runs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_format() {
        let id = RunCache::generate_run_id();
        // YYYYmmdd_HHMMSS_xxxxxxxx
        assert_eq!(id.len(), 24);
        assert_eq!(id.matches('_').count(), 2);
    }

    #[test]
    fn test_stage_and_publish_atomicity() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = RunCache::at(tmp.path()).unwrap();

        let staged = cache.stage("run_a").unwrap();
        std::fs::write(staged.dir().join(METRICS_FILE), "{}").unwrap();

        // Not visible while staged
        assert!(!cache.contains("run_a"));
        assert!(matches!(
            cache.read("run_a"),
            Err(AutoRegressError::RunNotFound(_))
        ));

        let final_dir = staged.publish().unwrap();
        assert!(final_dir.join(METRICS_FILE).exists());
        assert!(cache.contains("run_a"));
        // Staging area is gone after the rename
        assert!(!tmp.path().join(STAGING_DIR).join("run_a").exists());
    }

    #[test]
    fn test_discard_removes_staging() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = RunCache::at(tmp.path()).unwrap();

        let staged = cache.stage("run_b").unwrap();
        let dir = staged.dir().to_path_buf();
        staged.discard();
        assert!(!dir.exists());
        assert!(!cache.contains("run_b"));
    }

    #[test]
    fn test_read_missing_run() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = RunCache::at(tmp.path()).unwrap();
        assert!(matches!(
            cache.read("nope"),
            Err(AutoRegressError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_predictions_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(PREDICTIONS_FILE);

        let preds = vec![
            ValPrediction {
                row: 3,
                actual: 1.5,
                predicted: 1.25,
            },
            ValPrediction {
                row: 17,
                actual: -2.0,
                predicted: -1.75,
            },
        ];
        write_predictions(&path, &preds).unwrap();
        let loaded = read_predictions(&path).unwrap();
        assert_eq!(loaded, preds);
    }

    #[test]
    fn test_list_ignores_staging() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = RunCache::at(tmp.path()).unwrap();

        let staged = cache.stage("run_c").unwrap();
        std::fs::write(staged.dir().join(METRICS_FILE), "{}").unwrap();
        assert!(cache.list().unwrap().is_empty());

        staged.publish().unwrap();
        assert_eq!(cache.list().unwrap(), vec!["run_c".to_string()]);
    }
}

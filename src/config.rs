//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a training run and later evaluation.
///
/// All knobs live here and are passed explicitly; nothing is read from
/// ambient global settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Categorical columns with more distinct values than this are flagged
    /// high-cardinality and excluded from one-hot encoding
    pub cardinality_threshold: usize,

    /// Fraction of rows held out for validation metrics
    pub validation_split: f64,

    /// Run-scoped seed for the hold-out shuffle and seeded estimators
    pub seed: u64,

    /// Maximum number of rows scored per evaluation invocation
    pub eval_max_rows: usize,

    /// A string column is treated as numeric when at least this fraction of
    /// its non-null values parses as a number after cleanup
    pub numeric_coercion_ratio: f64,

    /// Root directory for the run cache (None = `~/.autoregress/runs`)
    pub runs_root: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cardinality_threshold: 50,
            validation_split: 0.2,
            seed: 42,
            eval_max_rows: 100,
            numeric_coercion_ratio: 0.98,
            runs_root: None,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the cardinality threshold
    pub fn with_cardinality_threshold(mut self, threshold: usize) -> Self {
        self.cardinality_threshold = threshold;
        self
    }

    /// Builder method to set the validation split fraction
    pub fn with_validation_split(mut self, fraction: f64) -> Self {
        self.validation_split = fraction;
        self
    }

    /// Builder method to set the run seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the evaluation row cap
    pub fn with_eval_max_rows(mut self, max_rows: usize) -> Self {
        self.eval_max_rows = max_rows;
        self
    }

    /// Builder method to set the run cache root
    pub fn with_runs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.runs_root = Some(root.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.cardinality_threshold, 50);
        assert_eq!(config.eval_max_rows, 100);
        assert!((config.validation_split - 0.2).abs() < 1e-12);
        assert!(config.runs_root.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new()
            .with_cardinality_threshold(10)
            .with_validation_split(0.3)
            .with_seed(7)
            .with_runs_root("/tmp/runs");

        assert_eq!(config.cardinality_threshold, 10);
        assert_eq!(config.seed, 7);
        assert_eq!(config.runs_root, Some(PathBuf::from("/tmp/runs")));
    }
}

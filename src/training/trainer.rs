//! Candidate sweep over the hold-out split

use super::metrics::Metrics;
use super::model::{FittedModel, ModelKind};
use crate::error::{AutoRegressError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

/// One successfully trained candidate
#[derive(Debug, Clone)]
pub struct TrainedCandidate {
    pub kind: ModelKind,
    pub model: FittedModel,
    pub metrics: Metrics,
    /// Wall-clock fit+predict time
    pub seconds: f64,
    /// Predictions on the validation split
    pub predictions: Array1<f64>,
}

/// Outcome of a full candidate sweep
#[derive(Debug)]
pub struct TrainReport {
    pub trained: Vec<TrainedCandidate>,
    /// Candidates that failed, with their error messages
    pub failures: Vec<(ModelKind, String)>,
}

/// Fixed-fraction random hold-out split.
///
/// Shuffles row indices with a run-scoped deterministic seed, so repeated
/// runs on identical input + seed reproduce identical splits and metrics.
/// The validation side always gets at least one row, as does training.
pub fn holdout_split(
    n_samples: usize,
    validation_split: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if n_samples < 2 {
        return Err(AutoRegressError::ValidationError(format!(
            "need at least 2 rows to split, got {n_samples}"
        )));
    }
    if !(0.0..1.0).contains(&validation_split) || validation_split <= 0.0 {
        return Err(AutoRegressError::ValidationError(format!(
            "validation split must be in (0, 1), got {validation_split}"
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let val_size = ((n_samples as f64 * validation_split) as usize)
        .max(1)
        .min(n_samples - 1);

    let val = indices[..val_size].to_vec();
    let train = indices[val_size..].to_vec();
    Ok((train, val))
}

/// Trains each candidate in a fixed, documented order and scores it on the
/// validation split. A single failing candidate is recorded and excluded;
/// the sweep only fails when every candidate does.
pub struct ModelTrainer {
    candidates: Vec<ModelKind>,
    seed: u64,
}

impl ModelTrainer {
    pub fn new(candidates: Vec<ModelKind>, seed: u64) -> Self {
        Self { candidates, seed }
    }

    /// Run the sweep. `x_raw`/`x_raw_val` feed scale-insensitive models,
    /// `x_scaled`/`x_scaled_val` feed distance- and margin-based ones.
    /// `on_result` fires after each successful candidate so callers can
    /// stream incremental progress.
    pub fn run(
        &self,
        x_raw: &Array2<f64>,
        x_raw_val: &Array2<f64>,
        x_scaled: &Array2<f64>,
        x_scaled_val: &Array2<f64>,
        y_train: &Array1<f64>,
        y_val: &Array1<f64>,
        mut on_result: impl FnMut(&TrainedCandidate),
    ) -> Result<TrainReport> {
        let mut trained = Vec::new();
        let mut failures = Vec::new();

        for &kind in &self.candidates {
            let (x_train, x_val) = if kind.needs_scaling() {
                (x_scaled, x_scaled_val)
            } else {
                (x_raw, x_raw_val)
            };

            let start = Instant::now();
            let outcome = kind
                .fit(x_train, y_train, self.seed)
                .and_then(|model| model.predict(x_val).map(|pred| (model, pred)));

            match outcome {
                Ok((model, predictions)) => {
                    let seconds = start.elapsed().as_secs_f64();
                    let metrics = Metrics::compute(y_val, &predictions);
                    let candidate = TrainedCandidate {
                        kind,
                        model,
                        metrics,
                        seconds,
                        predictions,
                    };
                    on_result(&candidate);
                    trained.push(candidate);
                }
                Err(e) => {
                    failures.push((kind, e.to_string()));
                }
            }
        }

        if trained.is_empty() {
            return Err(AutoRegressError::AllModelsFailed);
        }

        Ok(TrainReport { trained, failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::DEFAULT_CANDIDATES;

    fn synthetic_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        // y = 3*x0 - 2*x1 + 5 with a small deterministic wobble
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                i as f64 / n as f64
            } else {
                ((i * 7) % n) as f64 / n as f64
            }
        });
        let y: Array1<f64> = (0..n)
            .map(|i| {
                let x0 = x[[i, 0]];
                let x1 = x[[i, 1]];
                3.0 * x0 - 2.0 * x1 + 5.0 + 0.001 * ((i % 3) as f64)
            })
            .collect();
        (x, y)
    }

    #[test]
    fn test_split_is_deterministic() {
        let (a_train, a_val) = holdout_split(100, 0.2, 42).unwrap();
        let (b_train, b_val) = holdout_split(100, 0.2, 42).unwrap();
        assert_eq!(a_train, b_train);
        assert_eq!(a_val, b_val);

        let (c_train, _) = holdout_split(100, 0.2, 43).unwrap();
        assert_ne!(a_train, c_train);
    }

    #[test]
    fn test_split_partitions_rows() {
        let (train, val) = holdout_split(50, 0.2, 1).unwrap();
        assert_eq!(train.len() + val.len(), 50);
        assert_eq!(val.len(), 10);

        let mut all: Vec<usize> = train.iter().chain(val.iter()).copied().collect();
        all.sort();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rejects_degenerate_input() {
        assert!(holdout_split(1, 0.2, 0).is_err());
        assert!(holdout_split(10, 0.0, 0).is_err());
        assert!(holdout_split(10, 1.0, 0).is_err());
    }

    #[test]
    fn test_sweep_trains_all_candidates() {
        let (x, y) = synthetic_data(60);
        let (train_idx, val_idx) = holdout_split(60, 0.2, 42).unwrap();

        let x_train = x.select(ndarray::Axis(0), &train_idx);
        let x_val = x.select(ndarray::Axis(0), &val_idx);
        let y_train: Array1<f64> = train_idx.iter().map(|&i| y[i]).collect();
        let y_val: Array1<f64> = val_idx.iter().map(|&i| y[i]).collect();

        let trainer = ModelTrainer::new(DEFAULT_CANDIDATES.to_vec(), 42);
        let mut seen = Vec::new();
        let report = trainer
            .run(
                &x_train, &x_val, &x_train, &x_val, &y_train, &y_val,
                |c| seen.push(c.kind),
            )
            .unwrap();

        assert_eq!(report.trained.len(), 5);
        assert!(report.failures.is_empty());
        // Incremental results arrive in the fixed candidate order
        assert_eq!(seen, DEFAULT_CANDIDATES.to_vec());

        // The linear relation should be captured nearly perfectly by OLS
        let linear = report
            .trained
            .iter()
            .find(|c| c.kind == ModelKind::Linear)
            .unwrap();
        assert!(linear.metrics.r2 > 0.99, "r2 = {}", linear.metrics.r2);
    }
}

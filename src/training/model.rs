//! Candidate model dispatch
//!
//! The candidate set is fixed and known at design time, so models are a
//! closed set of variants behind one fit/predict/name capability surface
//! rather than open-ended plugin dispatch.

use super::forest::RandomForestRegressor;
use super::knn::KnnRegressor;
use super::linear::{LinearRegression, RidgeRegression};
use super::svr::{SvrConfig, SvrRegressor};
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// The supported regression algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Linear,
    Ridge,
    RandomForest,
    Svr,
    Knn,
}

/// Fixed training order for a full candidate sweep
pub const DEFAULT_CANDIDATES: [ModelKind; 5] = [
    ModelKind::Linear,
    ModelKind::Ridge,
    ModelKind::RandomForest,
    ModelKind::Svr,
    ModelKind::Knn,
];

impl ModelKind {
    /// Stable name used in events, metrics.json, and the CLI
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Ridge => "ridge",
            Self::RandomForest => "random_forest",
            Self::Svr => "svr",
            Self::Knn => "knn",
        }
    }

    /// Parse a name back into a kind
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "linear" => Some(Self::Linear),
            "ridge" => Some(Self::Ridge),
            "random_forest" => Some(Self::RandomForest),
            "svr" => Some(Self::Svr),
            "knn" => Some(Self::Knn),
            _ => None,
        }
    }

    /// Whether this estimator needs standard-scaled inputs
    /// (distance- and margin-based models)
    pub fn needs_scaling(&self) -> bool {
        matches!(self, Self::Svr | Self::Knn)
    }

    /// Tie-break priority for winner selection; lower wins
    pub fn priority(&self) -> usize {
        match self {
            Self::Linear => 0,
            Self::Ridge => 1,
            Self::RandomForest => 2,
            Self::Svr => 3,
            Self::Knn => 4,
        }
    }

    /// Fit this kind of model with default hyperparameters
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>, seed: u64) -> Result<FittedModel> {
        match self {
            Self::Linear => {
                let mut model = LinearRegression::new();
                model.fit(x, y)?;
                Ok(FittedModel::Linear(model))
            }
            Self::Ridge => {
                let mut model = RidgeRegression::new(1.0);
                model.fit(x, y)?;
                Ok(FittedModel::Ridge(model))
            }
            Self::RandomForest => {
                let mut model = RandomForestRegressor::default().with_random_state(seed);
                model.fit(x, y)?;
                Ok(FittedModel::RandomForest(model))
            }
            Self::Svr => {
                let mut model = SvrRegressor::new(SvrConfig::for_features(x.ncols()));
                model.fit(x, y)?;
                Ok(FittedModel::Svr(model))
            }
            Self::Knn => {
                let mut model = KnnRegressor::with_k(5);
                model.fit(x, y)?;
                Ok(FittedModel::Knn(model))
            }
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A fitted candidate model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedModel {
    Linear(LinearRegression),
    Ridge(RidgeRegression),
    RandomForest(RandomForestRegressor),
    Svr(SvrRegressor),
    Knn(KnnRegressor),
}

impl FittedModel {
    /// Which algorithm produced this model
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::Linear(_) => ModelKind::Linear,
            Self::Ridge(_) => ModelKind::Ridge,
            Self::RandomForest(_) => ModelKind::RandomForest,
            Self::Svr(_) => ModelKind::Svr,
            Self::Knn(_) => ModelKind::Knn,
        }
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Self::Linear(m) => m.predict(x),
            Self::Ridge(m) => m.predict(x),
            Self::RandomForest(m) => m.predict(x),
            Self::Svr(m) => m.predict(x),
            Self::Knn(m) => m.predict(x),
        }
    }
}

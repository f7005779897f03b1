//! Model training
//!
//! Regression estimators (linear, ridge, random forest, SVR, KNN) behind a
//! closed-set dispatch enum, plus the trainer that fits every candidate on
//! a seeded hold-out split and the deterministic winner selection rule.

mod metrics;
mod model;
mod selector;
mod trainer;

pub mod forest;
pub mod knn;
pub mod linear;
pub mod svr;

pub use forest::{RandomForestRegressor, RegressionTree};
pub use knn::{KnnConfig, KnnRegressor, WeightScheme};
pub use linear::{LinearRegression, RidgeRegression};
pub use metrics::Metrics;
pub use model::{FittedModel, ModelKind, DEFAULT_CANDIDATES};
pub use selector::{select_winner, R2_EPSILON};
pub use svr::{SvrConfig, SvrRegressor};
pub use trainer::{holdout_split, ModelTrainer, TrainReport, TrainedCandidate};

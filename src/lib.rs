//! autoregress - Regression model selection engine
//!
//! Automates regression-model selection over a user-supplied CSV:
//! preprocesses the data, trains several candidate regressors, scores them
//! with standard metrics, and exports the best model as a reproducible,
//! re-loadable bundle.
//!
//! # Modules
//!
//! ## Core pipeline
//! - [`data`] - CSV loading
//! - [`schema`] - Dataset schema inference and the frozen data contract
//! - [`preprocessing`] - Imputation, one-hot encoding, scaling
//! - [`training`] - Candidate regressors, metrics, winner selection
//!
//! ## Run lifecycle
//! - [`worker`] - Isolated worker process, event stream, cancellation
//! - [`cache`] - Per-run artifact store with atomic publish
//! - [`export`] - All-or-nothing bundle export
//! - [`evaluate`] - Reload an exported bundle and score new data
//!
//! ## Supporting
//! - [`bundle`] - Winning model + fitted pipeline as one serialized unit
//! - [`plot`] - PNG chart rendering
//! - [`cli`] - Command-line interface

pub mod error;

pub mod config;
pub mod data;
pub mod schema;

pub mod preprocessing;
pub mod training;

pub mod bundle;
pub mod cache;
pub mod evaluate;
pub mod export;
pub mod plot;
pub mod worker;

pub mod cli;

pub use error::{AutoRegressError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{AutoRegressError, Result};

    pub use crate::config::EngineConfig;
    pub use crate::data::DataLoader;
    pub use crate::schema::{FeatureKind, Schema, SchemaInferer};

    pub use crate::preprocessing::Pipeline;
    pub use crate::training::{
        select_winner, FittedModel, Metrics, ModelKind, ModelTrainer, DEFAULT_CANDIDATES,
    };

    pub use crate::bundle::ModelBundle;
    pub use crate::cache::{MetricsReport, RunArtifact, RunCache};
    pub use crate::evaluate::{EvalOptions, EvalReport, EvaluationLoader};
    pub use crate::export::export_run;
    pub use crate::worker::{
        EventSink, RunController, TrainEvent, TrainRequest, WorkerHandle,
    };
}

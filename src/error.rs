//! Error types for the autoregress engine

use thiserror::Error;

/// Result type alias for autoregress operations
pub type Result<T> = std::result::Result<T, AutoRegressError>;

/// Main error type for the autoregress engine
#[derive(Error, Debug)]
pub enum AutoRegressError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Target column '{column}' is not numeric (uncoercible values e.g. {examples:?})")]
    InvalidTarget {
        column: String,
        examples: Vec<String>,
    },

    #[error("Model '{model}' failed to fit: {message}")]
    ModelFit { model: String, message: String },

    #[error("All candidate models failed to train")]
    AllModelsFailed,

    #[error("Worker crashed: {0}")]
    WorkerCrash(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Export failed: {0}")]
    ExportIo(String),

    #[error("Schema mismatch: missing columns {missing:?}, extra columns {extra:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Plot rendering error: {0}")]
    PlotError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AutoRegressError {
    /// Stable classification string used by the worker's `Failed` terminal event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataError(_) => "data",
            Self::InvalidTarget { .. } => "invalid_target",
            Self::ModelFit { .. } => "model_fit",
            Self::AllModelsFailed => "all_models_failed",
            Self::WorkerCrash(_) => "worker_crash",
            Self::RunNotFound(_) => "run_not_found",
            Self::ExportIo(_) => "export_io",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::Cancelled => "cancelled",
            Self::FeatureNotFound(_) => "feature_not_found",
            Self::ModelNotFitted => "model_not_fitted",
            Self::ShapeError { .. } => "shape",
            Self::ValidationError(_) => "validation",
            Self::PlotError(_) => "plot",
            Self::IoError(_) => "io",
            Self::SerializationError(_) => "serialization",
        }
    }
}

impl From<polars::error::PolarsError> for AutoRegressError {
    fn from(err: polars::error::PolarsError) -> Self {
        AutoRegressError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for AutoRegressError {
    fn from(err: serde_json::Error) -> Self {
        AutoRegressError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AutoRegressError {
    fn from(err: ndarray::ShapeError) -> Self {
        AutoRegressError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AutoRegressError::DataError("bad csv".to_string());
        assert_eq!(err.to_string(), "Data error: bad csv");
    }

    #[test]
    fn test_error_kind_classification() {
        let err = AutoRegressError::InvalidTarget {
            column: "price".to_string(),
            examples: vec!["N/A".to_string()],
        };
        assert_eq!(err.kind(), "invalid_target");
        assert_eq!(AutoRegressError::AllModelsFailed.kind(), "all_models_failed");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AutoRegressError = io_err.into();
        assert!(matches!(err, AutoRegressError::IoError(_)));
    }
}

//! Data preprocessing
//!
//! The fitted transform that bridges raw tabular data and the estimators:
//! - Missing-value imputation (numeric median, categorical constant token)
//! - One-hot encoding with unseen categories mapped to all-zero indicators
//! - Standard scaling for scale-sensitive estimators
//!
//! Fitted state round-trips through serde JSON with zero numeric drift; the
//! same parameters are reused, never refit, at evaluation time.

mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use encoder::OneHotEncoder;
pub use imputer::{ImputeStrategy, Imputer};
pub use pipeline::Pipeline;
pub use scaler::StandardScaler;

/// Token substituted for missing categorical values before encoding
pub const MISSING_TOKEN: &str = "missing";

//! Standard (z-score) feature scaling

use crate::error::{AutoRegressError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters for one fitted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ScalerParams {
    center: f64,
    scale: f64,
}

/// Standard scaler: (x - mean) / std per column.
///
/// Parameters are fitted once on training data and reused, never refit, at
/// inference time. Scaling is only applied for scale-sensitive estimators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    params: HashMap<String, ScalerParams>,
    is_fitted: bool,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    /// Create a new scaler
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the scaler to the given columns
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let series = df
                .column(col_name)
                .map_err(|_| AutoRegressError::FeatureNotFound(col_name.to_string()))?
                .as_materialized_series();

            let ca = series
                .cast(&DataType::Float64)
                .map_err(|e| AutoRegressError::DataError(e.to_string()))?
                .f64()
                .map_err(|e| AutoRegressError::DataError(e.to_string()))?
                .clone();

            let mean = ca.mean().unwrap_or(0.0);
            let std = ca.std(1).unwrap_or(1.0);

            self.params.insert(
                col_name.to_string(),
                ScalerParams {
                    center: mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                },
            );
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Scale a column's values in place using the fitted parameters
    pub fn scale_values(&self, column: &str, values: &mut [f64]) -> Result<()> {
        if !self.is_fitted {
            return Err(AutoRegressError::ModelNotFitted);
        }

        let params = self
            .params
            .get(column)
            .ok_or_else(|| AutoRegressError::FeatureNotFound(column.to_string()))?;

        for v in values.iter_mut() {
            *v = (*v - params.center) / params.scale;
        }

        Ok(())
    }

    /// Fitted (center, scale) for a column
    pub fn column_params(&self, column: &str) -> Option<(f64, f64)> {
        self.params.get(column).map(|p| (p.center, p.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scaling() {
        let df = df!("a" => &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        let mut scaler = StandardScaler::new();
        scaler.fit(&df, &["a"]).unwrap();

        let mut values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        scaler.scale_values("a", &mut values).unwrap();

        let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
        assert!(mean.abs() < 1e-10);
    }

    #[test]
    fn test_constant_column_uses_unit_scale() {
        let df = df!("a" => &[7.0, 7.0, 7.0]).unwrap();

        let mut scaler = StandardScaler::new();
        scaler.fit(&df, &["a"]).unwrap();

        let (center, scale) = scaler.column_params("a").unwrap();
        assert!((center - 7.0).abs() < 1e-12);
        assert!((scale - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_requires_fit() {
        let scaler = StandardScaler::new();
        let mut values = vec![1.0];
        assert!(matches!(
            scaler.scale_values("a", &mut values),
            Err(AutoRegressError::ModelNotFitted)
        ));
    }
}

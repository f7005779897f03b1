//! Missing value imputation

use crate::error::{AutoRegressError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the training-set median (numeric columns)
    Median,
    /// Replace with a constant string (categorical columns)
    ConstantString(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum FillValue {
    Numeric(f64),
    String(String),
}

/// Imputer for handling missing values.
///
/// Fill values are computed once at fit time and reused verbatim at
/// transform time; the imputer is never refit on inference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, FillValue>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the imputer to the given columns
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let series = df
                .column(col_name)
                .map_err(|_| AutoRegressError::FeatureNotFound(col_name.to_string()))?
                .as_materialized_series();

            let fill_value = match &self.strategy {
                ImputeStrategy::Median => {
                    let median = series
                        .cast(&DataType::Float64)
                        .map_err(|e| AutoRegressError::DataError(e.to_string()))?
                        .f64()
                        .map_err(|e| AutoRegressError::DataError(e.to_string()))?
                        .median()
                        .unwrap_or(0.0);
                    FillValue::Numeric(median)
                }
                ImputeStrategy::ConstantString(token) => FillValue::String(token.clone()),
            };

            self.fill_values.insert(col_name.to_string(), fill_value);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data by filling missing values
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(AutoRegressError::ModelNotFitted);
        }

        let mut result = df.clone();

        for (col_name, fill_value) in &self.fill_values {
            if let Ok(col) = df.column(col_name) {
                let filled = self.fill_series(col.as_materialized_series(), fill_value)?;
                result
                    .with_column(filled)
                    .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
            }
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fill value fitted for a column, if any
    pub fn fill_value(&self, column: &str) -> Option<f64> {
        match self.fill_values.get(column) {
            Some(FillValue::Numeric(v)) => Some(*v),
            _ => None,
        }
    }

    fn fill_series(&self, series: &Series, fill_value: &FillValue) -> Result<Series> {
        match fill_value {
            FillValue::Numeric(val) => {
                let ca = series
                    .cast(&DataType::Float64)
                    .map_err(|e| AutoRegressError::DataError(e.to_string()))?
                    .f64()
                    .map_err(|e| AutoRegressError::DataError(e.to_string()))?
                    .clone();

                let filled: Float64Chunked = ca
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(*val)))
                    .collect();

                Ok(filled.with_name(series.name().clone()).into_series())
            }
            FillValue::String(val) => {
                let ca = series
                    .str()
                    .map_err(|e| AutoRegressError::DataError(e.to_string()))?;

                let filled: StringChunked = ca
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(val.as_str()).to_string()))
                    .collect();

                Ok(filled.with_name(series.name().clone()).into_series())
            }
        }
    }
}

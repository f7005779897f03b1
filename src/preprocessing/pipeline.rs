//! Preprocessing pipeline

use super::{ImputeStrategy, Imputer, OneHotEncoder, StandardScaler, MISSING_TOKEN};
use crate::error::{AutoRegressError, Result};
use crate::schema::Schema;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Deterministic, order-preserving preprocessing transform.
///
/// Built from a frozen [`Schema`]; fitted once on the training split and
/// exported with the winning model as one unit. The output matrix layout is
/// fixed by the schema: numeric features in schema order, then the one-hot
/// blocks of each encodable categorical feature in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    numeric_imputer: Imputer,
    categorical_imputer: Imputer,
    encoder: OneHotEncoder,
    scaler: StandardScaler,
    is_fitted: bool,
}

impl Pipeline {
    /// Build an unfitted pipeline from a schema.
    ///
    /// High-cardinality categorical columns are not part of the transform.
    pub fn from_schema(schema: &Schema) -> Self {
        let numeric_columns: Vec<String> = schema
            .numeric_features()
            .into_iter()
            .map(String::from)
            .collect();
        let categorical_columns: Vec<String> = schema
            .encoded_categoricals()
            .into_iter()
            .map(String::from)
            .collect();

        Self {
            numeric_columns,
            categorical_columns,
            numeric_imputer: Imputer::new(ImputeStrategy::Median),
            categorical_imputer: Imputer::new(ImputeStrategy::ConstantString(
                MISSING_TOKEN.to_string(),
            )),
            encoder: OneHotEncoder::new(),
            scaler: StandardScaler::new(),
            is_fitted: false,
        }
    }

    /// Fit imputers, encoder, and scaler on the training split
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        if !self.numeric_columns.is_empty() {
            let cols: Vec<&str> = self.numeric_columns.iter().map(|s| s.as_str()).collect();
            self.numeric_imputer.fit(df, &cols)?;

            // Scaler sees imputed values, like every later transform
            let imputed = self.numeric_imputer.transform(df)?;
            self.scaler.fit(&imputed, &cols)?;
        }

        if !self.categorical_columns.is_empty() {
            let cols: Vec<&str> = self
                .categorical_columns
                .iter()
                .map(|s| s.as_str())
                .collect();
            let imputed = self.categorical_imputer.fit_transform(df, &cols)?;
            self.encoder.fit(&imputed, &cols)?;
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform a frame into the feature matrix.
    ///
    /// `scaled` selects whether numeric columns go through the fitted
    /// standard scaler; distance- and margin-based estimators need it,
    /// linear and tree models take the raw values.
    pub fn transform(&self, df: &DataFrame, scaled: bool) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(AutoRegressError::ModelNotFitted);
        }

        let n_rows = df.height();
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(self.output_width());

        if !self.numeric_columns.is_empty() {
            let imputed = self.numeric_imputer.transform(df)?;
            for name in &self.numeric_columns {
                let ca = imputed
                    .column(name)
                    .map_err(|_| AutoRegressError::FeatureNotFound(name.clone()))?
                    .as_materialized_series()
                    .f64()
                    .map_err(|e| AutoRegressError::DataError(e.to_string()))?
                    .clone();
                let mut values: Vec<f64> = ca.into_iter().map(|v| v.unwrap_or(0.0)).collect();
                if scaled {
                    self.scaler.scale_values(name, &mut values)?;
                }
                columns.push(values);
            }
        }

        if !self.categorical_columns.is_empty() {
            let imputed = self.categorical_imputer.transform(df)?;
            for name in &self.categorical_columns {
                let indicators = self.encoder.encode_column(&imputed, name)?;
                columns.extend(indicators);
            }
        }

        if columns.is_empty() {
            return Err(AutoRegressError::DataError(
                "pipeline produced no feature columns".to_string(),
            ));
        }

        let n_cols = columns.len();
        let col_refs: Vec<&[f64]> = columns.iter().map(|c| c.as_slice()).collect();
        Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
            col_refs[c][r]
        }))
    }

    /// Width of the output feature matrix
    pub fn output_width(&self) -> usize {
        let encoded: usize = self
            .categorical_columns
            .iter()
            .map(|c| self.encoder.width(c))
            .sum();
        self.numeric_columns.len() + encoded
    }

    /// Numeric column names, in output order
    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    /// Encoded categorical column names, in output order
    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }
}

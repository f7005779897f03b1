//! One-hot encoding of categorical columns

use crate::error::{AutoRegressError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One-hot encoder.
///
/// Category lists are captured sorted at fit time so the expanded column
/// order is stable across runs. A value unseen at fit time matches no
/// category and encodes as an all-zero indicator row, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    // column name -> sorted category list
    categories: BTreeMap<String, Vec<String>>,
    is_fitted: bool,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OneHotEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self {
            categories: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the encoder to the given columns
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let series = df
                .column(col_name)
                .map_err(|_| AutoRegressError::FeatureNotFound(col_name.to_string()))?
                .as_materialized_series();

            let ca = series
                .str()
                .map_err(|e| AutoRegressError::DataError(e.to_string()))?;

            let mut cats: Vec<String> = ca
                .into_iter()
                .flatten()
                .map(|s| s.to_string())
                .collect();
            cats.sort();
            cats.dedup();

            self.categories.insert(col_name.to_string(), cats);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Category list fitted for a column
    pub fn categories(&self, column: &str) -> Result<&[String]> {
        if !self.is_fitted {
            return Err(AutoRegressError::ModelNotFitted);
        }
        self.categories
            .get(column)
            .map(|v| v.as_slice())
            .ok_or_else(|| AutoRegressError::FeatureNotFound(column.to_string()))
    }

    /// Number of indicator columns a column expands into
    pub fn width(&self, column: &str) -> usize {
        self.categories.get(column).map(|c| c.len()).unwrap_or(0)
    }

    /// Encode one column into per-category indicator vectors, in the fitted
    /// category order. Unseen or missing values contribute all zeros.
    pub fn encode_column(&self, df: &DataFrame, column: &str) -> Result<Vec<Vec<f64>>> {
        let cats = self.categories(column)?.to_vec();

        let series = df
            .column(column)
            .map_err(|_| AutoRegressError::FeatureNotFound(column.to_string()))?
            .as_materialized_series();
        let ca = series
            .str()
            .map_err(|e| AutoRegressError::DataError(e.to_string()))?;

        let values: Vec<Option<&str>> = ca.into_iter().collect();

        let indicators: Vec<Vec<f64>> = cats
            .iter()
            .map(|cat| {
                values
                    .iter()
                    .map(|v| if *v == Some(cat.as_str()) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect();

        Ok(indicators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit_encoder() -> OneHotEncoder {
        let df = df!("city" => &["NYC", "LA", "NYC", "SF"]).unwrap();
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&df, &["city"]).unwrap();
        encoder
    }

    #[test]
    fn test_categories_sorted() {
        let encoder = fit_encoder();
        assert_eq!(encoder.categories("city").unwrap(), &["LA", "NYC", "SF"]);
        assert_eq!(encoder.width("city"), 3);
    }

    #[test]
    fn test_encode_known_values() {
        let encoder = fit_encoder();
        let df = df!("city" => &["LA", "SF"]).unwrap();
        let cols = encoder.encode_column(&df, "city").unwrap();

        // Column order: LA, NYC, SF
        assert_eq!(cols[0], vec![1.0, 0.0]);
        assert_eq!(cols[1], vec![0.0, 0.0]);
        assert_eq!(cols[2], vec![0.0, 1.0]);
    }

    #[test]
    fn test_unseen_category_is_all_zero() {
        let encoder = fit_encoder();
        let df = df!("city" => &["Tokyo"]).unwrap();
        let cols = encoder.encode_column(&df, "city").unwrap();

        for col in &cols {
            assert_eq!(col, &vec![0.0]);
        }
    }

    #[test]
    fn test_encode_requires_fit() {
        let encoder = OneHotEncoder::new();
        assert!(matches!(
            encoder.categories("city"),
            Err(AutoRegressError::ModelNotFitted)
        ));
    }
}

//! Dataset schema inference
//!
//! Classifies every non-target column as numeric or categorical, coercing
//! numeric-looking string columns (currency symbols, thousands separators)
//! into real numbers first. The resulting [`Schema`] is the frozen data
//! contract for a run: it is persisted as `schema.json` and reloaded
//! verbatim when an exported bundle is evaluated.

use crate::config::EngineConfig;
use crate::error::{AutoRegressError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

/// One feature column of the frozen schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
    /// Distinct-value count, recorded for categorical columns
    pub cardinality: Option<usize>,
}

/// Frozen data contract derived from a dataset and a target column.
///
/// The target is never a feature; every feature has exactly one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub target: String,
    pub features: Vec<FeatureSpec>,
    /// Categorical columns whose cardinality exceeds the configured
    /// threshold; excluded from one-hot encoding
    pub high_cardinality: Vec<String>,
    pub n_rows: usize,
    pub seed: u64,
    pub validation_split: f64,
    pub created_at: String,
}

impl Schema {
    /// All feature column names, in schema order
    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Numeric feature names, in schema order
    pub fn numeric_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.kind == FeatureKind::Numeric)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Categorical feature names that take part in one-hot encoding
    /// (high-cardinality columns are excluded)
    pub fn encoded_categoricals(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| {
                f.kind == FeatureKind::Categorical && !self.high_cardinality.contains(&f.name)
            })
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Save the schema as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a schema from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let schema: Self = serde_json::from_str(&json)?;
        Ok(schema)
    }
}

/// Result of schema inference: the cleaned dataset (numeric-looking string
/// columns coerced, bad target rows dropped) plus the derived schema.
#[derive(Debug)]
pub struct InferredDataset {
    pub df: DataFrame,
    pub schema: Schema,
    pub warnings: Vec<String>,
}

/// Schema inferer. Pure function of its inputs; the input frame is never
/// mutated in place.
pub struct SchemaInferer<'a> {
    config: &'a EngineConfig,
}

impl<'a> SchemaInferer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Infer the schema for `df` with `target` as the regression target.
    ///
    /// The target must exist and, after numeric coercion, resolve to a
    /// numeric column; otherwise this fails with `InvalidTarget` listing the
    /// values that could not coerce. Rows whose target value fails coercion
    /// are dropped with a warning rather than failing the run.
    pub fn infer(&self, df: &DataFrame, target: &str) -> Result<InferredDataset> {
        let mut warnings = Vec::new();

        let target_col = df
            .column(target)
            .map_err(|_| AutoRegressError::FeatureNotFound(target.to_string()))?;

        let (target_series, bad_examples) =
            coerce_to_numeric(target_col.as_materialized_series())?;

        let non_null_in = target_col.len() - target_col.as_materialized_series().null_count();
        let coerced_ok = target_series.len() - target_series.null_count();
        if non_null_in > 0 && coerced_ok == 0 {
            return Err(AutoRegressError::InvalidTarget {
                column: target.to_string(),
                examples: bad_examples,
            });
        }

        let mut result = df.clone();
        result
            .with_column(target_series.clone())
            .map_err(|e| AutoRegressError::DataError(e.to_string()))?;

        // Drop rows whose target value is missing or failed to coerce
        let dropped = target_series.null_count();
        if dropped > 0 {
            warnings.push(format!(
                "target contains {dropped} non-numeric values; dropping those rows"
            ));
            let mask = target_series.is_not_null();
            result = result
                .filter(&mask)
                .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
        }

        // Classify the remaining columns
        let mut features = Vec::new();
        let mut high_cardinality = Vec::new();

        let names: Vec<String> = result
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|n| n != target)
            .collect();

        for name in names {
            let series = result
                .column(&name)
                .map_err(|_| AutoRegressError::FeatureNotFound(name.clone()))?
                .as_materialized_series()
                .clone();

            if is_numeric_dtype(series.dtype()) {
                let casted = series
                    .cast(&DataType::Float64)
                    .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
                result
                    .with_column(casted)
                    .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
                features.push(FeatureSpec {
                    name,
                    kind: FeatureKind::Numeric,
                    cardinality: None,
                });
                continue;
            }

            // Non-numeric dtypes go through string form
            let as_str = series
                .cast(&DataType::String)
                .map_err(|e| AutoRegressError::DataError(e.to_string()))?;

            let (coerced, _) = coerce_to_numeric(&as_str)?;
            let non_null = as_str.len() - as_str.null_count();
            let ok = coerced.len() - coerced.null_count();

            if non_null > 0 && (ok as f64 / non_null as f64) >= self.config.numeric_coercion_ratio
            {
                result
                    .with_column(coerced)
                    .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
                features.push(FeatureSpec {
                    name,
                    kind: FeatureKind::Numeric,
                    cardinality: None,
                });
            } else {
                result
                    .with_column(as_str.clone())
                    .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
                let cardinality = as_str.n_unique().unwrap_or(0);
                if cardinality > self.config.cardinality_threshold {
                    warnings.push(format!(
                        "column '{name}' has {cardinality} distinct values \
                         (threshold {}); excluded from one-hot encoding",
                        self.config.cardinality_threshold
                    ));
                    high_cardinality.push(name.clone());
                }
                features.push(FeatureSpec {
                    name,
                    kind: FeatureKind::Categorical,
                    cardinality: Some(cardinality),
                });
            }
        }

        if features.is_empty() {
            return Err(AutoRegressError::DataError(
                "no feature columns available after cleaning".to_string(),
            ));
        }

        let schema = Schema {
            target: target.to_string(),
            features,
            high_cardinality,
            n_rows: result.height(),
            seed: self.config.seed,
            validation_split: self.config.validation_split,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        Ok(InferredDataset {
            df: result,
            schema,
            warnings,
        })
    }
}

/// Re-apply a frozen schema's column coercions to a new dataset.
///
/// Numeric features arriving as strings get the same cleanup + parse as at
/// training time; values that still fail to parse become nulls and are
/// handled by the fitted imputer downstream.
pub fn coerce_to_schema(df: &DataFrame, schema: &Schema) -> Result<DataFrame> {
    let mut result = df.clone();

    for spec in &schema.features {
        let series = result
            .column(&spec.name)
            .map_err(|_| AutoRegressError::FeatureNotFound(spec.name.clone()))?
            .as_materialized_series()
            .clone();

        let replacement = match spec.kind {
            FeatureKind::Numeric => {
                if is_numeric_dtype(series.dtype()) {
                    series
                        .cast(&DataType::Float64)
                        .map_err(|e| AutoRegressError::DataError(e.to_string()))?
                } else {
                    let as_str = series
                        .cast(&DataType::String)
                        .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
                    let (coerced, _) = coerce_to_numeric(&as_str)?;
                    coerced
                }
            }
            FeatureKind::Categorical => series
                .cast(&DataType::String)
                .map_err(|e| AutoRegressError::DataError(e.to_string()))?,
        };

        result
            .with_column(replacement)
            .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
    }

    Ok(result)
}

/// Check whether a dtype is natively numeric
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Coerce a series to Float64, cleaning currency symbols, thousands
/// separators, and stray spaces from string values first.
///
/// Returns the coerced series (uncoercible values become null) plus up to
/// five distinct raw values that failed to parse.
pub(crate) fn coerce_to_numeric(series: &Series) -> Result<(Series, Vec<String>)> {
    if is_numeric_dtype(series.dtype()) {
        let casted = series
            .cast(&DataType::Float64)
            .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
        return Ok((casted, Vec::new()));
    }

    let as_str = series
        .cast(&DataType::String)
        .map_err(|e| AutoRegressError::DataError(e.to_string()))?;
    let ca = as_str
        .str()
        .map_err(|e| AutoRegressError::DataError(e.to_string()))?;

    let mut bad_examples: Vec<String> = Vec::new();
    let values: Float64Chunked = ca
        .into_iter()
        .map(|opt| {
            opt.and_then(|raw| {
                let cleaned: String = raw
                    .chars()
                    .filter(|c| *c != ',' && *c != '$' && *c != ' ')
                    .collect();
                match cleaned.parse::<f64>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        if bad_examples.len() < 5 && !bad_examples.iter().any(|e| e == raw) {
                            bad_examples.push(raw.to_string());
                        }
                        None
                    }
                }
            })
        })
        .collect();

    Ok((
        values.with_name(series.name().clone()).into_series(),
        bad_examples,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_df() -> DataFrame {
        df!(
            "sqft" => &[1000.0, 1500.0, 2000.0, 2500.0, 3000.0],
            "city" => &["NYC", "LA", "NYC", "SF", "LA"],
            "price_text" => &["$100,000", "$150,000", "$200,000", "$250,000", "$300,000"],
            "price" => &[100.0, 150.0, 200.0, 250.0, 300.0]
        )
        .unwrap()
    }

    #[test]
    fn test_classifies_every_non_target_column() {
        let config = EngineConfig::default();
        let inferred = SchemaInferer::new(&config)
            .infer(&test_df(), "price")
            .unwrap();

        let schema = &inferred.schema;
        assert_eq!(schema.features.len(), 3);
        assert!(!schema.feature_names().contains(&"price"));

        let sqft = schema.features.iter().find(|f| f.name == "sqft").unwrap();
        assert_eq!(sqft.kind, FeatureKind::Numeric);

        let city = schema.features.iter().find(|f| f.name == "city").unwrap();
        assert_eq!(city.kind, FeatureKind::Categorical);
        assert_eq!(city.cardinality, Some(3));
    }

    #[test]
    fn test_currency_column_coerces_to_numeric() {
        let config = EngineConfig::default();
        let inferred = SchemaInferer::new(&config)
            .infer(&test_df(), "price")
            .unwrap();

        let spec = inferred
            .schema
            .features
            .iter()
            .find(|f| f.name == "price_text")
            .unwrap();
        assert_eq!(spec.kind, FeatureKind::Numeric);

        let col = inferred.df.column("price_text").unwrap();
        let first = col.as_materialized_series().f64().unwrap().get(0).unwrap();
        assert!((first - 100_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_numeric_target_rejected_with_examples() {
        let df = df!(
            "x" => &[1.0, 2.0, 3.0],
            "label" => &["N/A", "low", "high"]
        )
        .unwrap();

        let config = EngineConfig::default();
        let err = SchemaInferer::new(&config).infer(&df, "label").unwrap_err();
        match err {
            AutoRegressError::InvalidTarget { column, examples } => {
                assert_eq!(column, "label");
                assert!(examples.contains(&"N/A".to_string()));
            }
            other => panic!("expected InvalidTarget, got {other:?}"),
        }
    }

    #[test]
    fn test_partially_bad_target_drops_rows() {
        let df = df!(
            "x" => &[1.0, 2.0, 3.0, 4.0],
            "y" => &["10", "20", "oops", "40"]
        )
        .unwrap();

        let config = EngineConfig::default();
        let inferred = SchemaInferer::new(&config).infer(&df, "y").unwrap();
        assert_eq!(inferred.df.height(), 3);
        assert!(!inferred.warnings.is_empty());
    }

    #[test]
    fn test_high_cardinality_flagged() {
        let ids: Vec<String> = (0..100).map(|i| format!("id_{i}")).collect();
        let nums: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let df = df!(
            "id" => &ids,
            "x" => &nums,
            "y" => &nums
        )
        .unwrap();

        let config = EngineConfig::default().with_cardinality_threshold(50);
        let inferred = SchemaInferer::new(&config).infer(&df, "y").unwrap();
        assert_eq!(inferred.schema.high_cardinality, vec!["id".to_string()]);
        assert!(inferred.schema.encoded_categoricals().is_empty());
        assert!(!inferred.warnings.is_empty());
    }

    #[test]
    fn test_schema_roundtrip() {
        let config = EngineConfig::default();
        let inferred = SchemaInferer::new(&config)
            .infer(&test_df(), "price")
            .unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("schema.json");
        inferred.schema.save(&path).unwrap();
        let loaded = Schema::load(&path).unwrap();
        assert_eq!(loaded, inferred.schema);
    }
}

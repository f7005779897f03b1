//! Exported model bundle
//!
//! The winning estimator and its fitted preprocessing pipeline travel as
//! one serialized unit, so evaluation can never pair a model with the
//! wrong transform.

use crate::error::Result;
use crate::preprocessing::Pipeline;
use crate::training::FittedModel;
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Winning model + fitted pipeline, serialized together as `model.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub winner: String,
    pub model: FittedModel,
    pub pipeline: Pipeline,
    /// Whether the winner consumes standard-scaled numeric inputs
    pub scaled_input: bool,
    pub created_at: String,
}

impl ModelBundle {
    pub fn new(winner: String, model: FittedModel, pipeline: Pipeline) -> Self {
        let scaled_input = model.kind().needs_scaling();
        Self {
            winner,
            model,
            pipeline,
            scaled_input,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Apply the frozen pipeline and predict.
    ///
    /// The frame must already be coerced to the run's schema
    /// (see [`crate::schema::coerce_to_schema`]).
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = self.pipeline.transform(df, self.scaled_input)?;
        self.model.predict(&x)
    }

    /// Save the bundle as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a bundle from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let bundle: Self = serde_json::from_str(&json)?;
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::schema::SchemaInferer;
    use crate::training::ModelKind;
    use polars::prelude::*;

    fn make_bundle() -> (ModelBundle, DataFrame) {
        let df = df!(
            "x" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "y" => &[2.0, 4.0, 6.0, 8.0, 10.0, 12.0]
        )
        .unwrap();

        let config = EngineConfig::default();
        let inferred = SchemaInferer::new(&config).infer(&df, "y").unwrap();

        let mut pipeline = Pipeline::from_schema(&inferred.schema);
        pipeline.fit(&inferred.df).unwrap();

        let x = pipeline.transform(&inferred.df, false).unwrap();
        let y: Array1<f64> = inferred
            .df
            .column("y")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();

        let model = ModelKind::Linear.fit(&x, &y, 42).unwrap();
        let bundle = ModelBundle::new("linear".to_string(), model, pipeline);
        (bundle, inferred.df)
    }

    #[test]
    fn test_bundle_predicts() {
        let (bundle, df) = make_bundle();
        let pred = bundle.predict(&df).unwrap();
        assert_eq!(pred.len(), 6);
        assert!((pred[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_bundle_roundtrip_predictions_identical() {
        let (bundle, df) = make_bundle();

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("model.json");
        bundle.save(&path).unwrap();
        let restored = ModelBundle::load(&path).unwrap();

        let a = bundle.predict(&df).unwrap();
        let b = restored.predict(&df).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scaled_input_tracks_model_kind() {
        let (bundle, _) = make_bundle();
        assert!(!bundle.scaled_input);
    }
}

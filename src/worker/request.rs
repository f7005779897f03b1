//! Worker input contract

use crate::config::EngineConfig;
use crate::error::Result;
use crate::training::{ModelKind, DEFAULT_CANDIDATES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a worker process needs to run one training job.
///
/// Created by the caller, serialized to JSON, consumed once by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRequest {
    pub csv_path: PathBuf,
    pub target: String,
    /// Candidate algorithms, trained in this order
    pub candidates: Vec<ModelKind>,
    pub config: EngineConfig,
}

impl TrainRequest {
    /// Request with the full default candidate sweep
    pub fn new(csv_path: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            csv_path: csv_path.into(),
            target: target.into(),
            candidates: DEFAULT_CANDIDATES.to_vec(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<ModelKind>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    /// Serialize to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Deserialize from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

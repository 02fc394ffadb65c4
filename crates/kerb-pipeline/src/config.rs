//! Pipeline configuration and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use kerb_core::errors::{KerbError, Result};
use kerb_gnn::TrainConfig;
use kerb_graph::{ScoreWeights, DEFAULT_BUFFER_M};

/// Full pipeline configuration.
///
/// Every field has a default, so an empty TOML file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Selection radius around each neighborhood boundary, map units
    #[serde(default = "default_buffer_m")]
    pub buffer_m: f64,

    /// Subgraph cache directory
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Clear the cache before running
    #[serde(default = "default_false")]
    pub refresh_cache: bool,

    /// Connect the neighborhood node to every other node in its subgraph
    #[serde(default = "default_true")]
    pub hub_edges: bool,

    /// Rule-scorer weights
    #[serde(default)]
    pub weights: ScoreWeights,

    /// GNN training hyperparameters
    #[serde(default)]
    pub gnn: TrainConfig,

    /// Stop after rule scoring, leaving the refined column empty
    #[serde(default = "default_false")]
    pub skip_gnn: bool,
}

fn default_buffer_m() -> f64 {
    DEFAULT_BUFFER_M
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("kerb_cache")
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_m: DEFAULT_BUFFER_M,
            cache_dir: default_cache_dir(),
            refresh_cache: false,
            hub_edges: true,
            weights: ScoreWeights::default(),
            gnn: TrainConfig::default(),
            skip_gnn: false,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| KerbError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Returns an error if any constraints are violated.
    pub fn validate(&self) -> Result<()> {
        if !self.buffer_m.is_finite() || self.buffer_m <= 0.0 {
            return Err(KerbError::config(format!(
                "buffer_m must be a positive finite number, got {}",
                self.buffer_m
            )));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(KerbError::config("cache_dir must not be empty"));
        }
        for (name, value) in [
            ("residential", self.weights.residential),
            ("commercial", self.weights.commercial),
            ("education", self.weights.education),
            ("ndvi", self.weights.ndvi),
            ("tree", self.weights.tree),
            ("transit", self.weights.transit),
        ] {
            if !value.is_finite() {
                return Err(KerbError::config(format!(
                    "weights.{name} must be finite, got {value}"
                )));
            }
        }
        self.gnn.validate()?;
        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn buffer_m(mut self, buffer_m: f64) -> Self {
        self.config.buffer_m = buffer_m;
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    pub fn refresh_cache(mut self, refresh: bool) -> Self {
        self.config.refresh_cache = refresh;
        self
    }

    pub fn hub_edges(mut self, hub_edges: bool) -> Self {
        self.config.hub_edges = hub_edges;
        self
    }

    pub fn weights(mut self, weights: ScoreWeights) -> Self {
        self.config.weights = weights;
        self
    }

    pub fn gnn(mut self, gnn: TrainConfig) -> Self {
        self.config.gnn = gnn;
        self
    }

    pub fn skip_gnn(mut self, skip: bool) -> Self {
        self.config.skip_gnn = skip;
        self
    }

    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

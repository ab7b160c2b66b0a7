//! Configuration for the extraction pipeline.
//!
//! Every section carries `#[serde(default)]`, so a JSON file only needs the
//! fields it overrides:
//!
//! ```rust
//! use mathsnap::pipeline::PipelineConfig;
//!
//! let config = PipelineConfig::from_json_str(r#"{"quality": {"min_entropy": 5.0}}"#)?;
//! assert_eq!(config.quality.min_entropy, 5.0);
//! assert_eq!(config.max_dimension, 1500);
//! # Ok::<(), mathsnap::core::OCRError>(())
//! ```

use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::constants::{DEFAULT_MAX_DIMENSION, DEFAULT_PARALLEL_THRESHOLD};
use crate::core::OCRError;
use crate::processors::{DeskewConfig, EnhancerConfig, QualityThresholds};
use crate::recognition::ArbiterConfig;
use crate::text::SplitterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Longest image side after downscaling.
    pub max_dimension: u32,
    /// Batches larger than this run in parallel.
    pub parallel_threshold: usize,
    pub quality: QualityThresholds,
    pub enhancer: EnhancerConfig,
    pub deskew: DeskewConfig,
    pub arbiter: ArbiterConfig,
    pub splitter: SplitterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            quality: QualityThresholds::default(),
            enhancer: EnhancerConfig::default(),
            deskew: DeskewConfig::default(),
            arbiter: ArbiterConfig::default(),
            splitter: SplitterConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(content: &str) -> Result<Self, OCRError> {
        let config: Self = serde_json::from_str(content).map_err(|e| OCRError::ConfigError {
            message: format!("Failed to parse JSON config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, OCRError> {
        let content = std::fs::read_to_string(path).map_err(|e| OCRError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&content)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, OCRError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl ConfigValidator for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "max_dimension must be greater than 0".to_string(),
            });
        }
        self.quality.validate()?;
        self.enhancer.validate()?;
        self.deskew.validate()?;
        self.arbiter.validate()?;
        self.splitter.validate()
    }
}

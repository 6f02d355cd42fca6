//! Analysis configuration, persisted as TOML.
//!
//! Every tunable constant of the pipeline lives here: the similarity
//! threshold, path bounds, clustering seed, and the recommendation
//! calibration. Missing fields fall back to their defaults, so a config file
//! only needs the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::recommend::RecommendConfig;
use crate::score::ScoreConfig;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Full configuration of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Cosine similarity at or above which two terms are joined.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Embedding model identifier passed to the embedding provider.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub score: ScoreConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
}

fn default_similarity_threshold() -> f64 {
    0.5
}
fn default_model() -> String {
    "default".into()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            model: default_model(),
            score: ScoreConfig::default(),
            recommend: RecommendConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        let t = self.similarity_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return invalid(format!("similarity_threshold must lie in (0, 1], got {t}"));
        }
        if self.score.path_cutoff == 0 || self.recommend.path_cutoff == 0 {
            return invalid("path cutoffs must be at least 1".into());
        }
        if self.score.max_paths == 0 || self.recommend.max_paths == 0 {
            return invalid("max_paths must be at least 1".into());
        }
        if self.recommend.top_paths == 0 {
            return invalid("recommend.top_paths must be at least 1".into());
        }
        self.recommend.validate().map_err(|e| ConfigError::Invalid {
            message: format!("recommend: {e}"),
        })?;
        Ok(())
    }

    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

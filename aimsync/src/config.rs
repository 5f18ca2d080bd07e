//! Configuration management for aimsync
//!
//! Default config location: ./aimsync.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generation::ProviderConfig;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Location of the persisted transform cache document
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Examples retained per template (oldest evicted first)
    #[serde(default = "default_max_examples")]
    pub max_examples: usize,
    /// Minimum best-match score for a cache hit
    #[serde(default = "default_hit_threshold")]
    pub hit_threshold: f64,
    /// Minimum score for a template to count as usable in reports
    #[serde(default = "default_usable_threshold")]
    pub usable_threshold: f64,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/transform-cache.json")
}

fn default_max_examples() -> usize {
    5
}

fn default_hit_threshold() -> f64 {
    0.8
}

fn default_usable_threshold() -> f64 {
    0.7
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            max_examples: default_max_examples(),
            hit_threshold: default_hit_threshold(),
            usable_threshold: default_usable_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    /// Location of the persisted field mapping document
    #[serde(default = "default_mapping_path")]
    pub path: PathBuf,
    /// Source records analyzed when deriving a new mapping
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

fn default_mapping_path() -> PathBuf {
    PathBuf::from("data/field-mapping.json")
}

fn default_sample_size() -> usize {
    5
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            path: default_mapping_path(),
            sample_size: default_sample_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Sampling temperature for product transforms
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Sampling temperature for field mapping analysis
    #[serde(default = "default_mapping_temperature")]
    pub mapping_temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_mapping_temperature() -> f32 {
    0.3
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            temperature: default_temperature(),
            mapping_temperature: default_mapping_temperature(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_level() -> String {
    "info,aimsync=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file path, or fall back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cache.hit_threshold", self.cache.hit_threshold),
            ("cache.usable_threshold", self.cache.usable_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.cache.max_examples == 0 {
            return Err(Error::Config(
                "cache.max_examples must be at least 1".to_string(),
            ));
        }
        if self.mapping.sample_size == 0 {
            return Err(Error::Config(
                "mapping.sample_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! Configuration loading and parsing

use anyhow::{Context, Result};
use drive_stats::{EngineConfig, OutputFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

impl AppConfig {
    /// Apply command-line overrides on top of file values
    pub fn with_overrides(mut self, threshold_secs: Option<i64>, format: Option<OutputFormat>) -> Self {
        if let Some(secs) = threshold_secs {
            self.engine.threshold_secs = secs;
        }
        if let Some(format) = format {
            self.output.format = format;
        }
        self
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .engine
        .validate()
        .with_context(|| format!("Invalid engine settings in {:?}", path))?;

    Ok(config)
}

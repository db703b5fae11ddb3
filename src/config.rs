// Server configuration
// Loaded from a TOML file, every key optional, then overridden from the environment

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{ComposerError, Result};

/// Environment variable overriding `bind_addr`
pub const ENV_BIND: &str = "COMPOSER_BIND";
/// Environment variable overriding `storage_dir`
pub const ENV_STORAGE: &str = "COMPOSER_STORAGE";
/// Environment variable overriding `log_filter`
pub const ENV_LOG: &str = "COMPOSER_LOG";

/// Top level server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComposerConfig {
    /// Address the HTTP server listens on
    pub bind_addr: String,

    /// Directory saved viewsheets are written to and opened from
    pub storage_dir: String,

    /// Session lifetime in seconds
    pub session_ttl_secs: u64,

    /// env_logger filter, e.g. "info" or "composer=debug"
    pub log_filter: String,

    /// Commands kept per document for clients polling for patches
    pub max_commands_per_document: usize,

    /// Fixed band sizes used when laying out chart areas
    pub chart: ChartAreaConfig,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            storage_dir: "database".to_string(),
            session_ttl_secs: 24 * 60 * 60,
            log_filter: "info".to_string(),
            max_commands_per_document: 512,
            chart: ChartAreaConfig::default(),
        }
    }
}

/// Pixel sizes of the bands around a chart's plot area
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartAreaConfig {
    pub title_height: u32,
    pub legend_width: u32,
    pub legend_height: u32,
    pub x_axis_height: u32,
    pub y_axis_width: u32,
    pub margin: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for ChartAreaConfig {
    fn default() -> Self {
        Self {
            title_height: 30,
            legend_width: 100,
            legend_height: 30,
            x_axis_height: 30,
            y_axis_width: 40,
            margin: 5,
            min_width: 120,
            min_height: 120,
        }
    }
}

impl ComposerConfig {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ComposerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file if it exists, otherwise start from defaults; then apply env overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let text = fs::read_to_string(path)?;
            Self::from_toml(&text)?
        } else {
            Self::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(bind) = env::var(ENV_BIND) {
            if !bind.is_empty() {
                self.bind_addr = bind;
            }
        }
        if let Ok(dir) = env::var(ENV_STORAGE) {
            if !dir.is_empty() {
                self.storage_dir = dir;
            }
        }
        if let Ok(filter) = env::var(ENV_LOG) {
            if !filter.is_empty() {
                self.log_filter = filter;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.bind_addr.is_empty() {
            return Err(ComposerError::config("bind_addr cannot be empty"));
        }
        if self.session_ttl_secs == 0 {
            return Err(ComposerError::config("session_ttl_secs must be positive"));
        }
        if self.max_commands_per_document == 0 {
            return Err(ComposerError::config(
                "max_commands_per_document must be positive",
            ));
        }
        if self.chart.min_width == 0 || self.chart.min_height == 0 {
            return Err(ComposerError::config("chart minimum size must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ComposerConfig::from_toml(
            r#"
            bind_addr = "0.0.0.0:8080"

            [chart]
            title_height = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.chart.title_height, 42);
        assert_eq!(config.chart.legend_width, 100);
        assert_eq!(config.session_ttl_secs, 24 * 60 * 60);
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = ComposerConfig::from_toml("session_ttl_secs = 0").unwrap_err();
        assert!(matches!(err, ComposerError::Config(_)));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ComposerConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.max_commands_per_document, 512);
    }
}

//! Configuration handling
//!
//! Manages the `fikl.toml` configuration file.
//!
//! ## Environment Variables
//!
//! The following environment variables override config file settings:
//!
//! - `FIKL_FORMAT` - Default output format (`json` or `csv`)
//! - `FIKL_OUTPUT_DIR` - Base directory for relative output paths
//! - `FIKL_LOG` - Log level or filter directive
//! - `FIKL_MAX_DOCUMENTS` - Maximum documents one selection may fetch
//!
//! These can be set in a `.env` file next to `fikl.toml`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use fikl_core::{Format, QueryLimits};
use serde::{Deserialize, Serialize};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "fikl.toml";

/// Environment variable names
pub const ENV_FORMAT: &str = "FIKL_FORMAT";
pub const ENV_OUTPUT_DIR: &str = "FIKL_OUTPUT_DIR";
pub const ENV_LOG: &str = "FIKL_LOG";
pub const ENV_MAX_DOCUMENTS: &str = "FIKL_MAX_DOCUMENTS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiklConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Format used when a query's output clause names none
    #[serde(default)]
    pub format: Format,
    /// Base for relative output paths
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: Format::default(),
            directory: default_directory(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// A bare level (`debug`) or a full filter directive (`fikl=debug,warn`)
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LoggingConfig {
    /// Filter directive for the configured level.
    pub fn filter_directive(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("fikl={level},fikl_core={level}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
}

fn default_max_documents() -> usize {
    QueryLimits::default().max_documents
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_documents: default_max_documents(),
        }
    }
}

impl FiklConfig {
    /// Load configuration from a directory
    ///
    /// This also loads any `.env` file in the directory and applies
    /// environment variable overrides. A missing `fikl.toml` yields the
    /// defaults.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        Self::load_with_env(dir, ".env")
    }

    fn load_with_env(dir: &Path, env_file: &str) -> anyhow::Result<Self> {
        let env_path = dir.join(env_file);
        if env_path.exists() {
            dotenvy::from_path(&env_path)
                .with_context(|| format!("Failed to load {}", env_path.display()))?;
        }

        let config_path = dir.join(CONFIG_FILE_NAME);
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("Invalid configuration in {}", config_path.display()))?
        } else {
            tracing::debug!(path = %config_path.display(), "no configuration file, using defaults");
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(format) = get(ENV_FORMAT) {
            self.output.format = match format.trim().to_ascii_lowercase().as_str() {
                "json" => Format::Json,
                "csv" => Format::Csv,
                other => anyhow::bail!("{} must be 'json' or 'csv', got '{}'", ENV_FORMAT, other),
            };
        }

        if let Some(directory) = get(ENV_OUTPUT_DIR) {
            self.output.directory = PathBuf::from(directory);
        }

        if let Some(level) = get(ENV_LOG) {
            self.logging.level = level;
        }

        if let Some(max) = get(ENV_MAX_DOCUMENTS) {
            self.limits.max_documents = max
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number, got '{}'", ENV_MAX_DOCUMENTS, max))?;
        }

        Ok(())
    }

    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            max_documents: self.limits.max_documents,
        }
    }
}

//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/arbor/config.toml)
//! 3. Environment variables (ARBOR_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::datastore::StoreOptions;

/// Environment variable prefix
const ENV_PREFIX: &str = "ARBOR";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Document opened when none is named (empty = the unnamed document)
    #[serde(default)]
    pub doc_name: String,

    /// Whether stores cache reads and writes in memory
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,

    /// Artificial latency before every store operation, in milliseconds
    #[serde(default)]
    pub simulate_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            doc_name: String::new(),
            use_cache: default_use_cache(),
            simulate_delay_ms: 0,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (ARBOR_DOC_NAME, ARBOR_USE_CACHE, ARBOR_SIMULATE_DELAY_MS)
    /// 2. Config file (~/.config/arbor/config.toml or ARBOR_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // ARBOR_DOC_NAME
        if let Ok(val) = std::env::var(format!("{}_DOC_NAME", ENV_PREFIX)) {
            self.doc_name = val;
        }

        // ARBOR_USE_CACHE
        if let Ok(val) = std::env::var(format!("{}_USE_CACHE", ENV_PREFIX)) {
            self.use_cache = val.eq_ignore_ascii_case("true") || val == "1";
        }

        // ARBOR_SIMULATE_DELAY_MS
        if let Ok(val) = std::env::var(format!("{}_SIMULATE_DELAY_MS", ENV_PREFIX)) {
            self.simulate_delay_ms = val
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}_SIMULATE_DELAY_MS: {:?}", ENV_PREFIX, val))?;
        }

        Ok(())
    }

    /// Save configuration to a file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with ARBOR_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("arbor")
            .join("config.toml")
    }

    /// Options for stores created under this configuration
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            use_cache: self.use_cache,
            simulate_delay: (self.simulate_delay_ms > 0)
                .then(|| Duration::from_millis(self.simulate_delay_ms)),
        }
    }
}

fn default_use_cache() -> bool {
    true
}

//! Configuration types for the bot engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the bot engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Remote preference store settings.
    pub store: StoreConfig,
    /// Scraper invocation and scheduling settings.
    pub scraper: ScraperConfig,
}

/// Remote preference store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the preference API, e.g. `https://api.example.com/preferences`.
    pub base_url: String,
    /// Request timeout in seconds for store calls.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/preferences".to_owned(),
            timeout_secs: 30,
        }
    }
}

/// Scraper invocation and scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Endpoint URL of the long-running scraper task.
    pub endpoint: String,
    /// Request timeout in seconds for a single scraper invocation.
    ///
    /// The scraper is a long task; this is deliberately far above interactive
    /// timeouts. No retries are attempted on top of it.
    pub timeout_secs: u64,
    /// Seconds per unit of `job_frequency_hours`.
    ///
    /// Production leaves this at 3600. Tests shrink it to run sub-second
    /// firing intervals.
    pub interval_base_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000/scrape".to_owned(),
            timeout_secs: 900,
            interval_base_secs: 3600,
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::BotError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::BotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/towkay/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("towkay").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("towkay")
                .join("config.toml")
        } else {
            PathBuf::from("towkay-config.toml")
        }
    }
}

//! Deployment configuration.
//!
//! ```toml
//! [emission]
//! reward_per_block = 10000
//! start_block = 100
//!
//! [tokens]
//! reward_name = "SushiToken"
//! reward_symbol = "SUSHI"
//! share_name = "SushiBar"
//! share_symbol = "xSUSHI"
//!
//! [logging]
//! log_level = "info"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SOUS_CONFIG";

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChefConfig {
    #[serde(default)]
    pub emission: EmissionConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Staking engine emission schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionConfig {
    /// Base reward minted per block across all pools.
    #[serde(default = "default_reward_per_block")]
    pub reward_per_block: u64,
    /// First block that accrues reward.
    #[serde(default = "default_start_block")]
    pub start_block: u64,
}

/// Names of the tokens created at deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_reward_name")]
    pub reward_name: String,
    #[serde(default = "default_reward_symbol")]
    pub reward_symbol: String,
    #[serde(default = "default_share_name")]
    pub share_name: String,
    #[serde(default = "default_share_symbol")]
    pub share_symbol: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "trace" | "debug" | "info" | "warn" | "error". `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_reward_per_block() -> u64 {
    10_000
}

fn default_start_block() -> u64 {
    100
}

fn default_reward_name() -> String {
    "SushiToken".to_string()
}

fn default_reward_symbol() -> String {
    "SUSHI".to_string()
}

fn default_share_name() -> String {
    "SushiBar".to_string()
}

fn default_share_symbol() -> String {
    "xSUSHI".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            reward_per_block: default_reward_per_block(),
            start_block: default_start_block(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            reward_name: default_reward_name(),
            reward_symbol: default_reward_symbol(),
            share_name: default_share_name(),
            share_symbol: default_share_symbol(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ChefConfig {
    /// Load the file named by `SOUS_CONFIG`.
    ///
    /// Falls back to defaults if the variable is unset or the file does not
    /// exist.
    pub fn load() -> anyhow::Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)?;
                let config = Self::from_toml_str(&content)?;
                tracing::info!(path = %path.display(), "config loaded");
                Ok(config)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Parse a TOML document. Missing sections and keys take their defaults.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV).map(PathBuf::from)
    }
}

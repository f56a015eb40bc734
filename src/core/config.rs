//! Application configuration management
//!
//! Settings come from an optional TOML file; command-line flags are applied
//! on top by the `start` command.

use crate::core::paths::Paths;
use crate::core::provider::AccountType;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 300;

/// Default server port
const DEFAULT_PORT: u16 = 4141;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CopilotConfig {
    #[serde(default)]
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Minimum seconds between accepted requests
    #[serde(default)]
    pub rate_limit_seconds: Option<u64>,
    #[serde(default)]
    pub rate_limit_wait: bool,
    #[serde(default)]
    pub manual_approve: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            rate_limit_seconds: None,
            rate_limit_wait: false,
            manual_approve: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub copilot: CopilotConfig,
    #[serde(default)]
    pub request: RequestConfig,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Logging level
    pub log_level: String,

    pub account_type: AccountType,

    /// Request timeout in seconds
    pub request_timeout: u64,

    pub rate_limit_seconds: Option<u64>,

    /// Sleep instead of rejecting when rate limited
    pub rate_limit_wait: bool,

    pub manual_approve: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            account_type: AccountType::default(),
            request_timeout: default_request_timeout(),
            rate_limit_seconds: None,
            rate_limit_wait: false,
            manual_approve: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or names an
    /// unknown account type.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read configuration file")?;

        let config: TomlConfig =
            toml::from_str(&content).context("Failed to parse TOML configuration")?;

        Self::from_toml(config)
    }

    fn from_toml(config: TomlConfig) -> Result<Self> {
        let account_type = match config.copilot.account_type.as_deref() {
            Some(value) => value
                .parse::<AccountType>()
                .context("Invalid account_type in [copilot]")?,
            None => AccountType::default(),
        };

        Ok(Config {
            host: config.server.host,
            port: config.server.port,
            log_level: config.server.log_level,
            account_type,
            request_timeout: config.request.request_timeout,
            rate_limit_seconds: config.request.rate_limit_seconds.filter(|s| *s > 0),
            rate_limit_wait: config.request.rate_limit_wait,
            manual_approve: config.request.manual_approve,
        })
    }

    /// Load from an explicit path, or from `config.toml` in the config
    /// directory when it exists, or fall back to defaults
    pub fn load(explicit: Option<&Path>, paths: &Paths) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display())),
            None if paths.config_file_path.exists() => Self::from_file(&paths.config_file_path)
                .with_context(|| format!("Failed to load {}", paths.config_file_path.display())),
            None => Ok(Self::default()),
        }
    }
}

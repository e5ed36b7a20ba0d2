use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CHANNEL_POLL_INTERVAL_SECS, DEFAULT_API_URL, DEFAULT_PAYMENT_CANCEL_URL,
    DEFAULT_PAYMENT_RETURN_URL, DEFAULT_RESTORE_ATTEMPTS, DEFAULT_RESTORE_BACKOFF_MS,
    HTTP_REQUEST_TIMEOUT_SECS,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Remote API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Session restore configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Polling configuration
    #[serde(default)]
    pub polling: PollingConfig,

    /// Payment configuration
    #[serde(default)]
    pub payment: PaymentConfig,
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL, including any path prefix (e.g. http://localhost:8000/api)
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session restore settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// How many times to try restoring before reporting failure
    pub restore_attempts: u32,
    /// Pause between restore attempts
    pub restore_backoff_ms: u64,
    /// Override for the stored credentials file
    pub credentials_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restore_attempts: DEFAULT_RESTORE_ATTEMPTS,
            restore_backoff_ms: DEFAULT_RESTORE_BACKOFF_MS,
            credentials_path: None,
        }
    }
}

impl SessionConfig {
    pub fn restore_backoff(&self) -> Duration {
        Duration::from_millis(self.restore_backoff_ms)
    }
}

/// Polling settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    /// Channel message refresh interval in seconds
    pub channel_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            channel_interval_secs: CHANNEL_POLL_INTERVAL_SECS,
        }
    }
}

impl PollingConfig {
    pub fn channel_interval(&self) -> Duration {
        // Zero would make tokio's interval panic
        Duration::from_secs(self.channel_interval_secs.max(1))
    }
}

/// Payment settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentConfig {
    /// Deep link the checkout page returns to on success
    pub return_url: String,
    /// Deep link the checkout page returns to on cancel
    pub cancel_url: String,
    /// Enables the development-only subscription bypass
    pub allow_test_activation: bool,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            return_url: DEFAULT_PAYMENT_RETURN_URL.to_string(),
            cancel_url: DEFAULT_PAYMENT_CANCEL_URL.to_string(),
            allow_test_activation: false,
        }
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let global_config = get_config_dir()?.join("config.toml");
    let local_config = PathBuf::from(".cannon/config.toml");
    load_config_from(&[global_config, local_config])
}

/// Load configuration from an explicit list of TOML files, later files winning
pub fn load_config_from(paths: &[PathBuf]) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    for path in paths {
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }
    }

    // Environment variables (CANNON_ prefix, `__` separates sections)
    figment = figment.merge(Env::prefixed("CANNON_").split("__"));

    figment.extract().context("Failed to load configuration")
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "cannon") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("cannon");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
///
/// Returns the path of the file that was written, if any.
pub fn init_config() -> Result<Option<PathBuf>> {
    let config_file = get_config_dir()?.join("config.toml");

    if config_file.exists() {
        return Ok(None);
    }

    save_config(&Config::default(), &config_file)?;
    Ok(Some(config_file))
}

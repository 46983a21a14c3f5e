//! Client configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RepoPushError, Result};

const CONFIG_DIR_NAME: &str = "repopush";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const API_URL_ENV: &str = "REPOPUSH_API_URL";
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Retry settings for repository listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Fixed delay between attempts
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1000,
        }
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// GitHub REST API root, e.g. `https://github.example.com/api/v3` for Enterprise
    pub api_base_url: String,

    pub user_agent: String,

    /// Deadline for each individual API request
    pub request_timeout_secs: u64,

    pub retry: RetrySettings,

    /// Token read from the environment; never written to disk
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: format!("repopush/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            retry: RetrySettings::default(),
            token: None,
        }
    }
}

impl Config {
    /// Default configuration directory, `<platform config dir>/repopush`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
    }

    /// Load configuration from disk, falling back to defaults when absent
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            RepoPushError::Config(format!(
                "Failed to parse {}: {}",
                config_path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default directory and apply environment overrides
    pub fn load_default() -> Result<Self> {
        let config = match Self::default_dir() {
            Some(dir) => Self::load(&dir)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `REPOPUSH_API_URL` and `GITHUB_TOKEN` from `lookup`
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.token = Some(token);
        }
        self.validate()?;
        Ok(self)
    }

    /// Save configuration to disk
    pub fn save(&self, config_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(config_dir)?;
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(config_dir.join(CONFIG_FILE), contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_base_url).map_err(|e| {
            RepoPushError::Config(format!("Invalid API URL '{}': {}", self.api_base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RepoPushError::Config(format!(
                "API URL must use http or https: {}",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(RepoPushError::Config(
                "Request timeout must be at least one second".to_string(),
            ));
        }
        if self.retry.attempts == 0 {
            return Err(RepoPushError::Config(
                "Retry attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// API base without a trailing slash
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

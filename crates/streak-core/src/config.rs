//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use streak_cache::{CachePolicy, EntryPolicy};
use streak_gateway::GatewayConfig;

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the database file holding the local snapshot
    pub database_path: PathBuf,
    /// Timer service origin
    pub base_url: String,
    /// Cookie sent with every request
    pub session_cookie: Option<String>,
    pub request_timeout_ms: u64,
    pub policy: PolicyConfig,
}

/// Refresh policy in milliseconds, as it appears in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub history_freshness_ms: u64,
    pub active_freshness_ms: u64,
    pub active_poll_ms: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            history_freshness_ms: 30_000,
            active_freshness_ms: 2_000,
            active_poll_ms: 5_000,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl PolicyConfig {
    pub fn cache_policy(&self) -> CachePolicy {
        let retry_delay = Duration::from_millis(self.retry_delay_ms);

        CachePolicy {
            history: EntryPolicy {
                freshness: Duration::from_millis(self.history_freshness_ms),
                attempts: self.retry_attempts,
                retry_delay,
            },
            active: EntryPolicy {
                freshness: Duration::from_millis(self.active_freshness_ms),
                attempts: self.retry_attempts,
                retry_delay,
            },
            poll_interval: Duration::from_millis(self.active_poll_ms),
        }
    }
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("streak.db"),
            base_url: "http://localhost:5000".to_string(),
            session_cookie: None,
            request_timeout_ms: 30_000,
            policy: PolicyConfig::default(),
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("STREAK"))
            .unwrap_or_else(|| PathBuf::from(".streak"))
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// `STREAK_BASE_URL`, `STREAK_SESSION_COOKIE` and `STREAK_DATABASE`
    pub fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var("STREAK_BASE_URL") {
            self.base_url = base_url;
        }
        if let Ok(cookie) = std::env::var("STREAK_SESSION_COOKIE") {
            self.session_cookie = Some(cookie).filter(|c| !c.is_empty());
        }
        if let Ok(path) = std::env::var("STREAK_DATABASE") {
            self.database_path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.policy.retry_attempts == 0 {
            return Err(CoreError::Config(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.policy.active_poll_ms == 0 {
            return Err(CoreError::Config(
                "active_poll_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| CoreError::Config(format!("invalid base_url {:?}: {}", self.base_url, e)))
    }

    pub fn gateway_config(&self) -> Result<GatewayConfig> {
        let mut gateway = GatewayConfig::new(self.base_url()?);
        gateway.session_cookie = self.session_cookie.clone();
        gateway.timeout = Duration::from_millis(self.request_timeout_ms);
        Ok(gateway)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

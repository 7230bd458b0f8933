//! Application state management
use std::path::Path;
use std::sync::Arc;

use streak_core::{Config, SignInRedirect, TimerClient};

pub struct AppState {
    client: TimerClient,
    redirect: Arc<SignInRedirect>,
}

impl AppState {
    pub fn new(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = load_config(config_path)?;
        let (client, redirect) = TimerClient::open(&config)?;

        Ok(Self { client, redirect })
    }

    pub fn client(&self) -> &TimerClient {
        &self.client
    }

    pub fn redirect(&self) -> &SignInRedirect {
        &self.redirect
    }
}

/// File settings first, then environment overrides on top.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env();
    config.validate()?;

    tracing::debug!(base_url = %config.base_url, "Configuration loaded");
    Ok(config)
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_URL: &str = "ws://localhost:8080/eds";
pub const DEFAULT_AUTH_PREFIX: &str = "EDS authentication challenge: ";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// EDS session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// WebSocket endpoint of the EDS
    pub url: String,
    /// Application namespace mixed into the identity hash
    pub app_id: Option<String>,
    /// Text signed in front of every challenge
    pub auth_prefix: String,
    /// Fixed wait between a lost transport and the next attempt
    #[serde(with = "millis", rename = "reconnect_delay_ms")]
    pub reconnect_delay: Duration,
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            app_id: None,
            auth_prefix: DEFAULT_AUTH_PREFIX.to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl SessionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Load the `[eds]` table of a TOML file; missing table means defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let toml_value: toml::Value = toml::from_str(&content)?;

        let config = match toml_value.get("eds") {
            Some(table) => table.clone().try_into()?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::default();

        if let Ok(val) = std::env::var("EDS_URL") {
            config.url = val;
        }

        if let Ok(val) = std::env::var("EDS_APP_ID") {
            if !val.is_empty() {
                config.app_id = Some(val);
            }
        }

        if let Ok(val) = std::env::var("EDS_AUTH_PREFIX") {
            config.auth_prefix = val;
        }

        if let Ok(val) = std::env::var("EDS_RECONNECT_DELAY_MS") {
            let ms: u64 = val
                .parse()
                .map_err(|e| anyhow!("Invalid EDS_RECONNECT_DELAY_MS '{}': {}", val, e))?;
            config.reconnect_delay = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// The URL must be an absolute `ws`/`wss` URL
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url).map_err(|e| anyhow!("Invalid EDS url '{}': {}", self.url, e))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(anyhow!("Unsupported EDS url scheme '{}'", other)),
        }
        if self.channel_capacity == 0 {
            return Err(anyhow!("channel_capacity must be at least 1"));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(delay.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

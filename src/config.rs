use anyhow::Context;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::{lastfm::Credentials, palette::CacheSettings};

pub const KEY_ENV: &str = "LASTFM_KEY";
pub const SECRET_ENV: &str = "LASTFM_SECRET";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub http: HttpConfig,
    #[serde(default)]
    pub lastfm: LastFmConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub defaults: Defaults,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

/// Secrets may live here, but the environment wins.
#[derive(Debug, Deserialize, Clone)]
pub struct LastFmConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for LastFmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            api_url: default_api_url(),
        }
    }
}

fn default_api_url() -> String {
    crate::lastfm::DEFAULT_API_URL.to_string()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing Last.fm secret: set {env} or lastfm.{field} in the config file")]
    MissingSecret {
        env: &'static str,
        field: &'static str,
    },
}

impl LastFmConfig {
    /// Resolved at invocation time, not at startup.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    fn credentials_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, ConfigError> {
        let resolve = |env_name: &'static str, field: &'static str, file: &Option<String>| {
            env(env_name)
                .or_else(|| file.clone())
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingSecret {
                    env: env_name,
                    field,
                })
        };
        Ok(Credentials {
            api_key: resolve(KEY_ENV, "api_key", &self.api_key)?,
            api_secret: resolve(SECRET_ENV, "api_secret", &self.api_secret)?,
        })
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let defaults = CacheSettings::default();
        Self {
            max_entries: defaults.max_entries,
            ttl_secs: defaults.ttl.as_secs(),
        }
    }
}

impl From<CacheConfig> for CacheSettings {
    fn from(c: CacheConfig) -> Self {
        CacheSettings {
            max_entries: c.max_entries,
            ttl: Duration::from_secs(c.ttl_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Defaults {
    pub identity: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            identity: "rj".to_string(),
        }
    }
}

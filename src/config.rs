//! Process-wide settings resolved from the environment at startup.

use std::env;
use std::path::PathBuf;

use crate::publish::{StoreConfig, DEFAULT_BUCKET};
use crate::{Error, Result};

pub const ENV_STORE_URL: &str = "FRAMECAST_STORE_URL";
pub const ENV_STORE_KEY: &str = "FRAMECAST_STORE_KEY";
pub const ENV_BUCKET: &str = "FRAMECAST_BUCKET";
pub const ENV_RENDER_URL: &str = "FRAMECAST_RENDER_URL";
pub const ENV_BIND: &str = "FRAMECAST_BIND";
pub const ENV_CHROME_PATH: &str = "FRAMECAST_CHROME_PATH";
pub const ENV_MAX_SESSIONS: &str = "FRAMECAST_MAX_SESSIONS";

const DEFAULT_RENDER_URL: &str = "http://127.0.0.1:8787/api/generate-frames";
const DEFAULT_BIND: &str = "0.0.0.0:8787";

const ERR_INVALID_MAX_SESSIONS: &str = "FRAMECAST_MAX_SESSIONS must be a positive integer";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Object store base URL; required to publish
    pub store_url: Option<String>,
    /// Static bearer credential; required to publish
    pub store_key: Option<String>,
    pub bucket: String,
    pub render_url: String,
    pub bind: String,
    pub chrome_path: Option<PathBuf>,
    pub max_sessions: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            store_key: None,
            bucket: DEFAULT_BUCKET.to_string(),
            render_url: DEFAULT_RENDER_URL.to_string(),
            bind: DEFAULT_BIND.to_string(),
            chrome_path: None,
            max_sessions: num_cpus::get(),
        }
    }
}

impl AppConfig {
    /// Read configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_sessions = match get(ENV_MAX_SESSIONS) {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| Error::ConfigError(ERR_INVALID_MAX_SESSIONS.to_string()))?,
            None => defaults.max_sessions,
        };

        Ok(Self {
            store_url: get(ENV_STORE_URL),
            store_key: get(ENV_STORE_KEY),
            bucket: get(ENV_BUCKET).unwrap_or(defaults.bucket),
            render_url: get(ENV_RENDER_URL).unwrap_or(defaults.render_url),
            bind: get(ENV_BIND).unwrap_or(defaults.bind),
            chrome_path: get(ENV_CHROME_PATH).map(PathBuf::from),
            max_sessions,
        })
    }

    /// Object store settings; fails when the URL or credential is missing.
    pub fn store(&self) -> Result<StoreConfig> {
        let base_url = self
            .store_url
            .clone()
            .ok_or_else(|| Error::ConfigError(format!("{} not set", ENV_STORE_URL)))?;
        let api_key = self
            .store_key
            .clone()
            .ok_or_else(|| Error::ConfigError(format!("{} not set", ENV_STORE_KEY)))?;
        Ok(StoreConfig {
            base_url,
            api_key,
            bucket: self.bucket.clone(),
            ..Default::default()
        })
    }
}

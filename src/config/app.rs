// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "VIBE_CONFIG_PATH";
pub const ENV_CACHE_TTL_SECS: &str = "VIBE_CACHE_TTL_SECS";
pub const ENV_DATA_DIR: &str = "VIBE_DATA_DIR";
pub const DEFAULT_CONFIG_PATH: &str = "config/vibe.toml";

fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_user_agent() -> String {
    concat!("dagens-vibe/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Base URLs of the external sources. Overridable so tests can point them at a mock server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub weather_base: String,
    pub news_feed_url: String,
    /// Address-rewriting proxy; the feed URL is passed as its `url` query parameter.
    pub news_proxy_url: Option<String>,
    pub forum_base: String,
    pub market_base: String,
    pub energy_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            weather_base: "https://api.open-meteo.com".into(),
            news_feed_url: "https://www.nrk.no/toppsaker.rss".into(),
            news_proxy_url: Some("https://api.allorigins.win/raw".into()),
            forum_base: "https://www.reddit.com".into(),
            market_base: "https://api.alternative.me".into(),
            energy_base: "https://www.hvakosterstrommen.no".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            data_dir: default_data_dir(),
            user_agent: default_user_agent(),
            endpoints: Endpoints::default(),
        }
    }
}

impl AppConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = if ext == "json" {
            serde_json::from_str(&content).context("parsing json config")?
        } else {
            toml::from_str(&content).context("parsing toml config")?
        };
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $VIBE_CONFIG_PATH (must exist)
    /// 2) config/vibe.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        Self::load_default_with(|k| std::env::var(k).ok())
    }

    /// Same as [`AppConfig::load_default`] but reads variables through `get`.
    pub fn load_default_with<F>(mut get: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut cfg = if let Some(p) = get(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };

        if let Some(v) = get(ENV_CACHE_TTL_SECS) {
            cfg.cache_ttl_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_CACHE_TTL_SECS} must be an integer"))?;
        }
        if let Some(v) = get(ENV_DATA_DIR) {
            cfg.data_dir = PathBuf::from(v);
        }
        Ok(cfg)
    }
}

/// Configuration management for stream-gateway
///
/// Layered with the `config` crate: built-in defaults, then an optional YAML
/// file, then `GATEWAY__*` environment variables (`__` separates nesting,
/// e.g. `GATEWAY__EMBY__API_KEY`).
use anyhow::{bail, Context};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

use crate::utils::build_full_url;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub server: ServerConfig,
    /// Shared secret for signed playback tokens
    pub encipher: String,
    pub emby: EmbyConfig,
    /// Single-backend form, kept for older config files
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
    /// Token lifetime in seconds
    pub play_url_max_alive_time: u64,
    pub cache: CacheConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub special_medias: Vec<SpecialMediaConfig>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbyConfig {
    pub url: String,
    pub port: u16,
    /// Used when the client does not send `api_key`
    #[serde(default)]
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default)]
    pub storage_base_path: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entry_size: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CalendarConfig {
    /// Wall-clock offset for date triggers; host local time when unset
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SpecialMediaConfig {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub media_source_id: String,
    #[serde(default)]
    pub media_path: String,
}

impl Config {
    /// Load configuration from `.env`, an optional YAML file and the environment
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = Self::defaults()?;
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            builder = builder.add_source(File::new(path, FileFormat::Yaml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("GATEWAY")
                .prefix_separator("__")
                .separator("__"),
        );

        Self::finish(builder).with_context(|| match path {
            Some(p) => format!("failed to load configuration from {}", p),
            None => "failed to load configuration".to_string(),
        })
    }

    /// Build configuration from an inline YAML document (defaults still apply)
    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let builder = Self::defaults()?.add_source(File::from_str(raw, FileFormat::Yaml));
        Self::finish(builder)
    }

    fn defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
        Ok(config::Config::builder()
            .set_default("log_level", "info")?
            .set_default("log_format", "text")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 60001)?
            .set_default("encipher", "")?
            .set_default("emby.url", "http://127.0.0.1")?
            .set_default("emby.port", 8096)?
            .set_default("emby.api_key", "")?
            .set_default("emby.timeout_secs", 10)?
            .set_default("play_url_max_alive_time", 6 * 60 * 60)?
            .set_default("cache.ttl_secs", 30 * 60)?
            .set_default("cache.max_entry_size", 2048)?)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let cfg: Config = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.encipher.is_empty() {
            bail!("encipher must be set to a non-empty shared secret");
        }
        if self.play_url_max_alive_time == 0 {
            bail!("play_url_max_alive_time must be positive");
        }
        if self.cache.ttl_secs == 0 {
            bail!("cache.ttl_secs must be positive");
        }
        if self.cache.max_entry_size == 0 {
            bail!("cache.max_entry_size must be positive");
        }
        let backends = self.resolved_backends();
        if backends.is_empty() {
            bail!("at least one backend with a url must be configured");
        }
        if backends.iter().any(|b| b.url.trim().is_empty()) {
            bail!("backend url must not be empty");
        }
        Ok(())
    }

    /// Backends in priority order; the first one is the default
    pub fn resolved_backends(&self) -> Vec<BackendConfig> {
        let mut all: Vec<BackendConfig> = self.backends.clone();
        if let Some(single) = &self.backend {
            if !all.contains(single) {
                all.push(single.clone());
            }
        }
        all
    }

    pub fn emby_base_url(&self) -> String {
        build_full_url(&self.emby.url, self.emby.port)
    }

    pub fn origin_timeout(&self) -> Duration {
        Duration::from_secs(self.emby.timeout_secs.max(1))
    }

    pub fn max_alive_time(&self) -> Duration {
        Duration::from_secs(self.play_url_max_alive_time)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Cache entries expiring before their tokens force extra origin round trips
    pub fn cache_shorter_than_tokens(&self) -> bool {
        self.cache.ttl_secs < self.play_url_max_alive_time
    }
}

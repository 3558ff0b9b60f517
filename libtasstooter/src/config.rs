//! Configuration management for tasstooter

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub const DEFAULT_KEYWORD: &str = "source";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub mastodon: Option<MastodonConfig>,
    #[serde(default)]
    pub replies: RepliesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/tasstooter/archive.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    pub instance: String,
    pub token_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepliesConfig {
    /// Word a reply must contain to be answered with the source
    #[serde(default = "default_keyword")]
    pub keyword: String,

    /// How long to wait between notification polls
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_keyword() -> String {
    DEFAULT_KEYWORD.to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file at the XDG location yields the default configuration;
    /// a file named by `TASSTOOTER_CONFIG` must exist.
    pub fn load() -> Result<Self> {
        if let Some(path) = explicit_config_path() {
            return Self::load_from_path(&path);
        }

        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default_config());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path, which must exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig::default(),
            mastodon: None,
            replies: RepliesConfig::default(),
        }
    }

    /// The Mastodon section, required for anything that talks to the network
    pub fn require_mastodon(&self) -> Result<&MastodonConfig> {
        self.mastodon
            .as_ref()
            .ok_or_else(|| ConfigError::MissingField("mastodon".to_string()).into())
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Some(path) = explicit_config_path() {
        return Ok(path);
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("tasstooter").join("config.toml"))
}

fn explicit_config_path() -> Option<PathBuf> {
    std::env::var("TASSTOOTER_CONFIG")
        .ok()
        .map(|path| PathBuf::from(shellexpand::tilde(&path).to_string()))
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_tokens_file")]
    pub tokens: PathBuf,

    /// Missing file means "run without proxy"
    #[serde(default = "default_proxies_file")]
    pub proxies: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            tokens: default_tokens_file(),
            proxies: default_proxies_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,

    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Seconds to wait before registering again after a logout.
    /// Unset keeps logout terminal.
    #[serde(default)]
    pub reregister_delay: Option<u64>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: default_ping_interval(),
            max_failures: default_max_failures(),
            reregister_delay: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    #[default]
    None,
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default)]
    pub store: StoreMode,

    #[serde(default = "default_sessions_dir")]
    pub directory: PathBuf,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            store: StoreMode::default(),
            directory: default_sessions_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Timing policy for one heartbeat loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSettings {
    pub ping_interval: Duration,
    pub max_failures: u32,
    pub reregister_delay: Option<Duration>,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        HeartbeatConfig::default().settings()
    }
}

impl HeartbeatConfig {
    pub fn settings(&self) -> HeartbeatSettings {
        HeartbeatSettings {
            ping_interval: Duration::from_secs(self.ping_interval),
            // A threshold of zero would log out before the first ping
            max_failures: self.max_failures.max(1),
            reregister_delay: self.reregister_delay.map(Duration::from_secs),
        }
    }
}

impl TimeoutsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

// Default value functions
fn default_ping_interval() -> u64 { 60 }
fn default_max_failures() -> u32 { 3 }
fn default_request_timeout() -> u64 { 30 }
fn default_log_level() -> String { "info".to_string() }
fn default_tokens_file() -> PathBuf { PathBuf::from("tokens.txt") }
fn default_proxies_file() -> PathBuf { PathBuf::from("proxies.txt") }

fn default_sessions_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nodeping")
        .join("sessions")
}

/// Get default config file path
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("nodeping")
        .join("config.toml")
}

fn read_config(path: &PathBuf) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::ParseConfig {
        path: path.clone(),
        source,
    })
}

/// Load config from file, or return defaults if not found.
///
/// Loading order:
/// 1. Specified path (if provided)
/// 2. ./config.toml (if exists)
/// 3. default_config_path() (usually ~/.config/nodeping/config.toml)
pub fn load_config(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    load_config_from(path, &PathBuf::from("config.toml"), &default_config_path())
}

fn load_config_from(
    path: Option<PathBuf>,
    local_config: &PathBuf,
    default_path: &PathBuf,
) -> Result<Config, ConfigError> {
    if let Some(config_path) = path {
        if !config_path.exists() {
            return Err(ConfigError::ConfigNotFound(config_path));
        }
        let config = read_config(&config_path)?;
        tracing::info!("Loaded config from specified path {:?}", config_path);
        return Ok(config);
    }

    if local_config.exists() {
        match read_config(local_config) {
            Ok(config) => {
                tracing::info!("Loaded config from current directory {:?}", local_config);
                return Ok(config);
            }
            Err(e) => {
                tracing::error!("{}. Falling back to default path.", e);
            }
        }
    }

    if default_path.exists() {
        let config = read_config(default_path)?;
        tracing::info!("Loaded config from default path {:?}", default_path);
        Ok(config)
    } else {
        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }
}

/// Expand ~ in path to home directory
pub fn expand_path(path: &PathBuf) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(rest) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    path.clone()
}

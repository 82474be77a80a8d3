//! Dashboard configuration.
//!
//! Resolution order: `fluxmap.toml` in the working directory if present,
//! otherwise environment variables. Keys in the file use the same names
//! as the environment variables, and the environment still backfills
//! keys the file leaves out.

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const ENV_UPDATE_URL: &str = "FLUXMAP_UPDATE_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "FLUXMAP_POLL_INTERVAL_MS";
pub const ENV_MAX_REPLAY_OFFSET_SECS: &str = "FLUXMAP_MAX_REPLAY_OFFSET_SECS";

pub const DEFAULT_CONFIG_FILE_NAME: &str = "fluxmap.toml";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
/// 12 hours, the deepest the backend keeps replayable history.
pub const DEFAULT_MAX_REPLAY_OFFSET_SECS: u64 = 43_200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub update_url: String,
    pub poll_interval_ms: u64,
    pub max_replay_offset_secs: u64,
}

impl DashboardConfig {
    pub fn new(update_url: impl Into<String>) -> Self {
        Self {
            update_url: update_url.into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_replay_offset_secs: DEFAULT_MAX_REPLAY_OFFSET_SECS,
        }
    }

    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    pub fn with_max_replay_offset_secs(mut self, max_replay_offset_secs: u64) -> Self {
        self.max_replay_offset_secs = max_replay_offset_secs;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_replay_offset_ms(&self) -> u64 {
        self.max_replay_offset_secs.saturating_mul(1000)
    }

    pub fn from_default_sources() -> Result<Self, ConfigError> {
        let config_path = Path::new(DEFAULT_CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::from_config_file(config_path);
        }
        Self::from_env()
    }

    pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::ReadConfigFile {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let value: toml::Value =
            toml::from_str(&content).map_err(|err| ConfigError::ParseConfigFile {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        let table = value
            .as_table()
            .ok_or_else(|| ConfigError::ParseConfigFile {
                path: path.display().to_string(),
                message: "root is not a TOML table".to_string(),
            })?;

        Self::from_env_with(|key| {
            table
                .get(key)
                .and_then(toml_value_to_string)
                .or_else(|| std::env::var(key).ok())
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    fn from_env_with<F>(mut getter: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let update_url = required_env(&mut getter, ENV_UPDATE_URL)?;
        let poll_interval_ms = parse_u64(&mut getter, ENV_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS)?;
        let max_replay_offset_secs = parse_u64(
            &mut getter,
            ENV_MAX_REPLAY_OFFSET_SECS,
            DEFAULT_MAX_REPLAY_OFFSET_SECS,
        )?;

        Ok(Self {
            update_url,
            poll_interval_ms,
            max_replay_offset_secs,
        })
    }
}

fn toml_value_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(value) => Some(value.clone()),
        toml::Value::Integer(value) => Some(value.to_string()),
        toml::Value::Float(value) => Some(value.to_string()),
        toml::Value::Boolean(value) => Some(value.to_string()),
        _ => None,
    }
}

fn required_env<F>(getter: &mut F, key: &'static str) -> Result<String, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let value = getter(key).ok_or(ConfigError::MissingEnv { key })?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyEnv { key });
    }
    Ok(value)
}

fn parse_u64<F>(getter: &mut F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    match getter(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingEnv { key: &'static str },
    EmptyEnv { key: &'static str },
    InvalidNumber { key: &'static str, value: String },
    ReadConfigFile { path: String, message: String },
    ParseConfigFile { path: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingEnv { key } => write!(f, "missing env variable: {key}"),
            ConfigError::EmptyEnv { key } => write!(f, "empty env variable: {key}"),
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "invalid value for {key}: {value}")
            }
            ConfigError::ReadConfigFile { path, message } => {
                write!(f, "read config file failed ({path}): {message}")
            }
            ConfigError::ParseConfigFile { path, message } => {
                write!(f, "parse config file failed ({path}): {message}")
            }
        }
    }
}

impl Error for ConfigError {}

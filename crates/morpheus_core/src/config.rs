//! Core runtime configuration.
//!
//! # Responsibility
//! - Resolve database path, logging settings and recurrence policy.
//! - Layer environment overrides over a TOML file over built-in defaults.
//!
//! # Invariants
//! - Every field has a default; an empty TOML document is valid.
//! - Blank environment values are ignored.

use crate::logging::default_log_level;
use crate::service::alarm_service::RecurrencePolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "MORPHEUS_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "MORPHEUS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "MORPHEUS_LOG_DIR";

const DEFAULT_DB_FILE: &str = "morpheus.sqlite3";
const DEFAULT_LOG_DIR: &str = "morpheus-logs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub recurrence: RecurrencePolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let base = std::env::temp_dir();
        Self {
            database_path: base.join(DEFAULT_DB_FILE),
            log_level: default_log_level().to_string(),
            log_dir: base.join(DEFAULT_LOG_DIR),
            recurrence: RecurrencePolicy::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse(toml::de::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "failed to read config `{}`: {message}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Read { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl CoreConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Reads `path` when it exists, else starts from defaults, then applies
    /// process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                })?;
                Self::from_toml_str(&raw)?
            }
            _ => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies overrides returned by `lookup` for the `MORPHEUS_*` keys.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        if let Some(path) = read(ENV_DB_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(dir);
        }
        self
    }
}

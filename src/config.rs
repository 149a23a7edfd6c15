use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::time::parse_duration_str;

const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration {0:?} (expected e.g. \"30s\", \"1m\", \"1h30m\")")]
    InvalidDuration(String),
    #[error("duration {0:?} must be greater than zero")]
    ZeroDuration(String),
    #[error("no database url: pass --dsn, set DATABASE_URL, or add db_url to the config file")]
    MissingDsn,
    #[error("cannot locate config file: neither GATOR_CONFIG nor HOME is set")]
    NoHome,
    #[error("config file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("config file {path} is not valid json: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
}

/// Session state persisted between invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub db_url: String,
    #[serde(default)]
    pub current_user_name: Option<String>,
}

impl Config {
    /// `$GATOR_CONFIG` if set, otherwise `$HOME/.gatorconfig.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(p) = env::var("GATOR_CONFIG") {
            if !p.trim().is_empty() {
                return Ok(PathBuf::from(p));
            }
        }
        let home = env::var_os("HOME").ok_or(ConfigError::NoHome)?;
        Ok(PathBuf::from(home).join(CONFIG_FILE_NAME))
    }

    /// A missing file reads as an empty config.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => return Err(ConfigError::Io { path: path.to_path_buf(), source }),
        };
        if raw.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })?;
        fs::write(path, data).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
    }

    pub fn set_user(&mut self, path: &Path, name: &str) -> Result<(), ConfigError> {
        self.current_user_name = Some(name.to_string());
        self.save_to(path)
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user_name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// DSN precedence: `--dsn`, then `DATABASE_URL`, then the config file's `db_url`.
pub fn resolve_dsn(cli: Option<String>, env_dsn: Option<String>, cfg: &Config) -> Result<String, ConfigError> {
    cli.filter(|s| !s.trim().is_empty())
        .or_else(|| env_dsn.filter(|s| !s.trim().is_empty()))
        .or_else(|| Some(cfg.db_url.clone()).filter(|s| !s.trim().is_empty()))
        .ok_or(ConfigError::MissingDsn)
}

/// Parse a poll interval or timeout; zero is rejected since it would spin the loop.
pub fn parse_interval(raw: &str) -> Result<Duration, ConfigError> {
    let d = parse_duration_str(raw).ok_or_else(|| ConfigError::InvalidDuration(raw.to_string()))?;
    if d.is_zero() {
        return Err(ConfigError::ZeroDuration(raw.to_string()));
    }
    Ok(d)
}

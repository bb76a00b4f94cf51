//! Load connection settings from the environment or a JSON file.

use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::Path;
use std::time::Duration;

impl DbConfig {
    /// Read `DB_*` variables; unset ones keep their defaults. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DbConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = DbConfig::default();
        if let Some(v) = lookup("DB_DRIVER") {
            cfg.driver = v;
        }
        if let Some(v) = lookup("DB_HOST") {
            cfg.host = v;
        }
        if let Some(v) = lookup("DB_PORT") {
            cfg.port = parse_number("DB_PORT", &v)?;
        }
        if let Some(v) = lookup("DB_NAME") {
            cfg.db_name = v;
        }
        if let Some(v) = lookup("DB_CHAR") {
            cfg.charset = v;
        }
        if let Some(v) = lookup("DB_USER") {
            cfg.user = v;
        }
        if let Some(v) = lookup("DB_PASS") {
            cfg.password = v;
        }
        if let Some(v) = lookup("DB_MAX_CONNECTIONS") {
            cfg.max_connections = parse_number("DB_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DB_ACQUIRE_TIMEOUT_SECS") {
            cfg.acquire_timeout = Some(Duration::from_secs(parse_number("DB_ACQUIRE_TIMEOUT_SECS", &v)?));
        }
        if let Some(v) = lookup("DB_STATEMENT_TIMEOUT_SECS") {
            cfg.statement_timeout = Some(Duration::from_secs(parse_number("DB_STATEMENT_TIMEOUT_SECS", &v)?));
        }
        validate(&cfg)?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: DbConfig = serde_json::from_str(s).map_err(|e| ConfigError::Load(e.to_string()))?;
        validate(&cfg)?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&s)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, v: &str) -> Result<T, ConfigError> {
    v.trim()
        .parse()
        .map_err(|_| ConfigError::Load(format!("{} is not a valid number: '{}'", key, v)))
}

//! Config validation: supported driver and well-formed connection parameters.

use crate::config::{DbConfig, DEFAULT_DRIVER};
use crate::error::ConfigError;

pub fn validate(config: &DbConfig) -> Result<(), ConfigError> {
    if !config.driver.eq_ignore_ascii_case(DEFAULT_DRIVER) {
        return Err(ConfigError::UnsupportedDriver(config.driver.clone()));
    }
    if config.host.trim().is_empty() {
        return Err(ConfigError::Validation("host must not be empty".into()));
    }
    if config.db_name.trim().is_empty() {
        return Err(ConfigError::Validation("database name must not be empty".into()));
    }
    if config.db_name.contains(['`', '\0', '/']) {
        return Err(ConfigError::Validation(format!(
            "invalid database name: '{}'",
            config.db_name
        )));
    }
    if config.charset.is_empty() || !config.charset.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Validation(format!(
            "invalid charset: '{}'",
            config.charset
        )));
    }
    if config.max_connections == 0 {
        return Err(ConfigError::Validation("max_connections must be at least 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate(&DbConfig::default()), Ok(()));
    }

    #[test]
    fn driver_match_ignores_case() {
        let cfg = DbConfig { driver: "MySQL".into(), ..DbConfig::default() };
        assert_eq!(validate(&cfg), Ok(()));
    }

    #[test]
    fn rejects_malformed_parameters() {
        let bad = [
            DbConfig { host: " ".into(), ..DbConfig::default() },
            DbConfig { db_name: String::new(), ..DbConfig::default() },
            DbConfig { db_name: "a`b".into(), ..DbConfig::default() },
            DbConfig { charset: "utf8;".into(), ..DbConfig::default() },
            DbConfig { charset: String::new(), ..DbConfig::default() },
            DbConfig { max_connections: 0, ..DbConfig::default() },
        ];
        for cfg in &bad {
            assert!(matches!(validate(cfg), Err(ConfigError::Validation(_))), "{:?}", cfg);
        }
    }
}

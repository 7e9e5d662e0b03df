//! # Configuration Management
//!
//! Configuration is read from `ROTATOR_*` environment variables (after
//! `.env` has been loaded by the binary) and validated before use. CLI flags
//! override individual values.

pub mod settings;

pub use settings::{DatabaseSettings, LoggingConfig, RotatorConfig, StoreConfig};

use crate::errors::{Error, Result};
use std::str::FromStr;

impl RotatorConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup. Missing keys fall
    /// back to defaults; unparsable values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("ROTATOR_STORE_DATABASE_URL") {
            config.store.url = url;
        }
        config.store.max_connections =
            parse_or(&lookup, "ROTATOR_STORE_MAX_CONNECTIONS", config.store.max_connections)?;
        config.store.auto_migrate =
            flag_or(&lookup, "ROTATOR_STORE_AUTO_MIGRATE", config.store.auto_migrate);

        config.password.length =
            parse_or(&lookup, "ROTATOR_PASSWORD_LENGTH", config.password.length)?;
        if let Some(exclude) = lookup("ROTATOR_EXCLUDE_CHARACTERS") {
            config.password.exclude_characters = exclude;
        }

        config.database.connect_timeout_seconds = parse_or(
            &lookup,
            "ROTATOR_DB_CONNECT_TIMEOUT_SECONDS",
            config.database.connect_timeout_seconds,
        )?;
        config.database.require_tls =
            flag_or(&lookup, "ROTATOR_DB_REQUIRE_TLS", config.database.require_tls);

        if let Some(level) = lookup("ROTATOR_LOG_LEVEL") {
            config.logging.level = level;
        }
        config.logging.json = flag_or(&lookup, "ROTATOR_LOG_JSON", config.logging.json);

        config.validate()?;
        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("Invalid value for {}: {}", key, e))),
        None => Ok(default),
    }
}

fn flag_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|s| s.to_lowercase() == "true" || s == "1").unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = RotatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.password.length, 32);
        assert!(!config.database.require_tls);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_config_from_lookup_overrides() {
        let config = RotatorConfig::from_lookup(lookup(&[
            ("ROTATOR_STORE_DATABASE_URL", "postgres://rotator@store/secrets"),
            ("ROTATOR_STORE_MAX_CONNECTIONS", "2"),
            ("ROTATOR_STORE_AUTO_MIGRATE", "true"),
            ("ROTATOR_PASSWORD_LENGTH", "48"),
            ("ROTATOR_EXCLUDE_CHARACTERS", "/@:"),
            ("ROTATOR_DB_CONNECT_TIMEOUT_SECONDS", "3"),
            ("ROTATOR_DB_REQUIRE_TLS", "1"),
            ("ROTATOR_LOG_LEVEL", "debug"),
            ("ROTATOR_LOG_JSON", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(config.store.url, "postgres://rotator@store/secrets");
        assert_eq!(config.store.max_connections, 2);
        assert!(config.store.auto_migrate);
        assert_eq!(config.password.length, 48);
        assert_eq!(config.password.exclude_characters, "/@:");
        assert_eq!(config.database.connect_timeout_seconds, 3);
        assert!(config.database.require_tls);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_config_rejects_unparsable_number() {
        let err = RotatorConfig::from_lookup(lookup(&[("ROTATOR_PASSWORD_LENGTH", "long")]))
            .unwrap_err();
        assert!(err.to_string().contains("ROTATOR_PASSWORD_LENGTH"));
    }

    #[test]
    fn test_config_rejects_short_password_length() {
        assert!(RotatorConfig::from_lookup(lookup(&[("ROTATOR_PASSWORD_LENGTH", "2")])).is_err());
    }
}

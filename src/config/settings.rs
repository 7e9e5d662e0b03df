//! # Configuration Settings
//!
//! Defines the configuration structure for the rotator.

use crate::errors::{Error, Result};
use crate::secrets::PasswordPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct RotatorConfig {
    /// Secret store connection
    #[validate(nested)]
    pub store: StoreConfig,

    /// Target database session settings
    #[validate(nested)]
    pub database: DatabaseSettings,

    /// Generated password policy
    pub password: PasswordPolicy,

    /// Logging configuration
    #[validate(nested)]
    pub logging: LoggingConfig,
}

impl RotatorConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if !self.store.url.starts_with("postgres://") && !self.store.url.starts_with("postgresql://")
        {
            return Err(Error::validation_field(
                "Store URL must start with 'postgres://' or 'postgresql://'",
                "store.url",
            ));
        }

        if self.store.min_connections > self.store.max_connections {
            return Err(Error::validation_field(
                "Min connections cannot exceed max connections",
                "store.min_connections",
            ));
        }

        self.password
            .validate()
            .map_err(|e| Error::validation_field(e.to_string(), "password"))?;

        Ok(())
    }
}

/// Secret store (Postgres) configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    /// Store connection URL
    #[validate(length(min = 1, message = "Store URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 32, message = "Max connections must be between 1 and 32"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Apply pending store migrations when the pool is created
    pub auto_migrate: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost:5432/secret_rotator".to_string(),
            max_connections: 4,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 60,
            auto_migrate: false,
        }
    }
}

impl StoreConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }
}

/// Sessions opened against the database whose credential is rotated
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseSettings {
    #[validate(range(
        min = 1,
        max = 60,
        message = "Database connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Refuse to connect without TLS (otherwise TLS is preferred)
    pub require_tls: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self { connect_timeout_seconds: 5, require_tls: false }
    }
}

impl DatabaseSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub level: String,

    /// Enable JSON structured logging
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RotatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.password.length, 32);
        assert_eq!(config.database.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_store_timeouts() {
        let config = StoreConfig { idle_timeout_seconds: 0, ..Default::default() };
        assert_eq!(config.idle_timeout(), None);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = RotatorConfig::default();
        config.store.url = "mysql://localhost/secrets".to_string();
        assert!(config.validate().is_err());

        let mut config = RotatorConfig::default();
        config.store.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = RotatorConfig::default();
        config.database.connect_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = RotatorConfig::default();
        config.password.length = 3;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { field: Some(ref f), .. } if f == "password"));
    }
}

//! # Secret Rotator
//!
//! Rotates a PostgreSQL credential held in a versioned, stage-labelled
//! secret store without a window in which the stored `CURRENT` credential
//! and the database password disagree.
//!
//! ## Architecture
//!
//! ```text
//! rotation event → RotationCoordinator → CredentialStore (secret versions + labels)
//!                          ↓
//!                  DatabaseConnector (short-lived admin sessions)
//! ```
//!
//! ## Core Components
//!
//! - [`secrets`]: credential records, stage labels, store backends and the
//!   password generator
//! - [`database`]: scoped administrative sessions against the target database
//! - [`rotation`]: the create / set / test / finish state machine
//! - [`storage`]: pool and migrations for the Postgres secret store
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use secret_rotator::{
//!     config::RotatorConfig, database::PgConnector, rotation::RotationCoordinator,
//!     secrets::{CredentialStoreClient, PostgresSecretBackend}, storage::create_pool,
//! };
//!
//! let config = RotatorConfig::from_env()?;
//! let pool = create_pool(&config.store).await?;
//! let store = CredentialStoreClient::new(Arc::new(PostgresSecretBackend::new(pool)));
//! let coordinator =
//!     RotationCoordinator::new(store, PgConnector::new(), config.password, config.database);
//! coordinator.rotate_now("prod/app-db").await?;
//! ```

pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
pub mod observability;
pub mod rotation;
pub mod secrets;
pub mod storage;

pub use config::RotatorConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "secret-rotator");
    }
}

//! # Database Connection Pool Management
//!
//! Connection pool for the Postgres-backed secret store.

use crate::config::StoreConfig;
use crate::errors::{Error, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Type alias for the store connection pool
pub type DbPool = PgPool;

/// Create a store connection pool with the specified configuration
pub async fn create_pool(config: &StoreConfig) -> Result<DbPool> {
    validate_config(config)?;

    let pool_options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .test_before_acquire(true);

    let pool_options = if let Some(idle_timeout) = config.idle_timeout() {
        pool_options.idle_timeout(idle_timeout)
    } else {
        pool_options
    };

    let pool = pool_options.connect(&config.url).await.map_err(|e| {
        tracing::error!(error = %e, url = %sanitize_url(&config.url), "Failed to create store pool");
        Error::database(e, format!("Failed to connect to store: {}", sanitize_url(&config.url)))
    })?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_ms = config.connect_timeout().as_millis(),
        idle_timeout_ms = config.idle_timeout().map(|d| d.as_millis()),
        "Secret store connection pool created"
    );

    if config.auto_migrate {
        tracing::info!("Auto-migration enabled, running secret store migrations");
        crate::storage::migrations::run_migrations(&pool).await?;
    }

    Ok(pool)
}

/// Validate store configuration
fn validate_config(config: &StoreConfig) -> Result<()> {
    if config.max_connections == 0 {
        return Err(Error::validation("max_connections must be greater than 0"));
    }

    if config.min_connections > config.max_connections {
        return Err(Error::validation("min_connections cannot be greater than max_connections"));
    }

    if config.url.is_empty() {
        return Err(Error::validation("store URL cannot be empty"));
    }

    if !config.url.starts_with("postgres://") && !config.url.starts_with("postgresql://") {
        return Err(Error::validation("store URL must start with 'postgres://' or 'postgresql://'"));
    }

    Ok(())
}

/// Sanitize database URL for logging (remove credentials)
pub fn sanitize_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if parsed.password().is_some() || !parsed.username().is_empty() {
            format!(
                "{}://***:***@{}{}",
                parsed.scheme(),
                parsed.host_str().unwrap_or("unknown"),
                parsed.path()
            )
        } else {
            url.to_string()
        }
    } else {
        url.to_string()
    }
}

//! # Structured Logging
//!
//! Subscriber setup and span macros. Log lines go to stderr so command
//! output on stdout stays machine-readable.

use crate::config::{LoggingConfig, RotatorConfig};
use tracing_subscriber::EnvFilter;

/// Create the span wrapping one rotation phase.
///
/// Every event logged while handling the phase carries `phase`, `secret_id`
/// and a per-invocation `operation_id`.
///
/// ```rust,ignore
/// let span = rotation_span!("create", "prod/app-db", version_id = %token);
/// ```
#[macro_export]
macro_rules! rotation_span {
    ($phase:expr, $secret_id:expr) => {
        tracing::info_span!(
            "rotation_phase",
            phase = %$phase,
            secret_id = %$secret_id,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($phase:expr, $secret_id:expr, $($field:tt)*) => {
        tracing::info_span!(
            "rotation_phase",
            phase = %$phase,
            secret_id = %$secret_id,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Installing twice (tests,
/// embedding hosts) keeps the first subscriber.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_current_span(true)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
    }
}

/// Log configuration at startup
pub fn log_config_info(config: &RotatorConfig) {
    tracing::info!(
        store_url = %crate::storage::pool::sanitize_url(&config.store.url),
        store_max_connections = config.store.max_connections,
        password_length = config.password.length,
        db_connect_timeout_seconds = config.database.connect_timeout_seconds,
        db_require_tls = config.database.require_tls,
        json_logging = config.logging.json,
        "Secret rotator configuration"
    );
}

//! # Error Handling
//!
//! Application-boundary error type. Each rotation component has its own error
//! enum (`secrets::SecretsError`, `database::DatabaseError`,
//! `rotation::RotationError`); this type adds the startup concerns around them
//! (configuration, store pool, migrations) for the binary and CLI.

use crate::rotation::RotationError;

/// Custom result type for application-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type at the application boundary
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Secret store database errors (pool creation, migrations)
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// A rotation phase failed
    #[error(transparent)]
    Rotation(#[from] RotationError),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Whether re-running the same invocation later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rotation(e) => e.is_retryable(),
            Self::Database { source, .. } => matches!(
                source,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors.field_errors().keys().next().map(|k| k.to_string());
        Self::Validation { message: errors.to_string(), field }
    }
}

//! Error types for credential store operations.

use thiserror::Error;

/// Result type for secrets operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while reading or relabelling versions in the store.
///
/// Messages carry secret ids, version ids and labels only. Secret values are
/// never part of an error.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// No version matches the requested label or version id.
    #[error("Secret not found: {secret_id} ({selector})")]
    NotFound { secret_id: String, selector: String },

    /// The stored value or label metadata could not be interpreted.
    #[error("Malformed payload for secret '{secret_id}': {reason}")]
    MalformedPayload { secret_id: String, reason: String },

    /// The version already holds `CURRENT`. Treated as success by `finish`.
    #[error("Version '{version_id}' of secret '{secret_id}' is already CURRENT")]
    AlreadyCurrent { secret_id: String, version_id: String },

    /// Backend failure. `transient` marks failures worth re-invoking for
    /// (connection loss, pool timeout).
    #[error("Backend error: {message}")]
    Backend { message: String, transient: bool },
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(secret_id: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::NotFound { secret_id: secret_id.into(), selector: selector.into() }
    }

    /// Create a malformed payload error.
    pub fn malformed(secret_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload { secret_id: secret_id.into(), reason: reason.into() }
    }

    /// Create an already-current marker.
    pub fn already_current(secret_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self::AlreadyCurrent { secret_id: secret_id.into(), version_id: version_id.into() }
    }

    /// Create a non-transient backend error.
    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into(), transient: false }
    }

    /// Create a transient backend error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into(), transient: true }
    }

    /// Whether re-invoking the phase later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend { transient: true, .. })
    }
}

impl From<sqlx::Error> for SecretsError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::unavailable(format!("store unavailable: {}", e)),
            other => Self::backend_error(format!("store query failed: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = SecretsError::not_found("prod/app-db", "stage PENDING");
        assert!(matches!(err, SecretsError::NotFound { .. }));
        assert_eq!(err.to_string(), "Secret not found: prod/app-db (stage PENDING)");

        let err = SecretsError::already_current("prod/app-db", "tok1");
        assert!(err.to_string().contains("already CURRENT"));

        let err = SecretsError::malformed("prod/app-db", "missing field `host`");
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(SecretsError::unavailable("pool timed out").is_transient());
        assert!(!SecretsError::backend_error("constraint violated").is_transient());
        assert!(!SecretsError::not_found("a", "b").is_transient());
        assert!(SecretsError::from(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!SecretsError::from(sqlx::Error::RowNotFound).is_transient());
    }
}

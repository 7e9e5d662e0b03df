//! Error types for administrative database sessions.

use thiserror::Error;

/// Result type for database session operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// SQLSTATE class for "invalid authorization specification".
const AUTHENTICATION_SQLSTATE_CLASS: &str = "28";

/// Errors raised while connecting to or talking to the target database.
///
/// Passwords never appear in these messages: server errors for
/// authentication failures and `ALTER USER` do not echo the literal.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The server could not be reached (refused, timeout, I/O, TLS).
    #[error("Connection to database host '{host}' failed: {message}")]
    Connection { host: String, message: String },

    /// The server rejected the credential.
    #[error("Authentication failed for user '{username}': {message}")]
    Authentication { username: String, message: String },

    /// The server rejected a statement.
    #[error("Statement failed: {message}")]
    Statement { message: String },
}

impl DatabaseError {
    pub fn connection(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection { host: host.into(), message: message.into() }
    }

    pub fn authentication(username: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication { username: username.into(), message: message.into() }
    }

    pub fn statement(message: impl Into<String>) -> Self {
        Self::Statement { message: message.into() }
    }

    /// Whether the failure is worth retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Maps a sqlx error raised on a connection to `host` as `username`.
    pub fn from_sqlx(err: sqlx::Error, host: &str, username: &str) -> Self {
        match err {
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
                if code.starts_with(AUTHENTICATION_SQLSTATE_CLASS) {
                    Self::authentication(username, format!("{} (SQLSTATE {})", db.message(), code))
                } else if code.is_empty() {
                    Self::statement(db.message().to_string())
                } else {
                    Self::statement(format!("{} (SQLSTATE {})", db.message(), code))
                }
            }
            sqlx::Error::Io(e) => Self::connection(host, e.to_string()),
            sqlx::Error::Tls(e) => Self::connection(host, format!("TLS: {}", e)),
            sqlx::Error::Protocol(message) => Self::connection(host, message),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                Self::connection(host, err.to_string())
            }
            other => Self::statement(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connection_errors_are_transient() {
        assert!(DatabaseError::connection("db", "connection refused").is_transient());
        assert!(!DatabaseError::authentication("app", "password authentication failed")
            .is_transient());
        assert!(!DatabaseError::statement("syntax error").is_transient());
    }

    #[test]
    fn test_from_sqlx_io_is_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = DatabaseError::from_sqlx(sqlx::Error::Io(io), "db.internal", "app");
        assert!(matches!(err, DatabaseError::Connection { ref host, .. } if host == "db.internal"));
    }

    #[test]
    fn test_from_sqlx_other_is_statement() {
        let err = DatabaseError::from_sqlx(sqlx::Error::RowNotFound, "db", "app");
        assert!(matches!(err, DatabaseError::Statement { .. }));
    }

    #[test]
    fn test_display_names_user_not_password() {
        let err = DatabaseError::authentication("app", "password authentication failed");
        assert_eq!(
            err.to_string(),
            "Authentication failed for user 'app': password authentication failed"
        );
    }
}

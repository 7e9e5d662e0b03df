//! Errors surfaced by a rotation phase.

use thiserror::Error;

use crate::database::DatabaseError;
use crate::secrets::{PasswordError, SecretsError};

pub type Result<T> = std::result::Result<T, RotationError>;

/// Everything a phase can fail with. The triggering platform decides whether
/// to re-invoke based on [`RotationError::is_retryable`].
#[derive(Error, Debug)]
pub enum RotationError {
    #[error("Unsupported rotation phase '{0}'")]
    UnsupportedPhase(String),

    #[error("Invalid rotation event: {0}")]
    InvalidEvent(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Secrets(#[from] SecretsError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl RotationError {
    /// True for connectivity failures only. Everything else needs an operator
    /// or a new rotation attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(e) => e.is_transient(),
            Self::Secrets(e) => e.is_transient(),
            Self::UnsupportedPhase(_) | Self::InvalidEvent(_) | Self::Password(_) => false,
        }
    }

    /// Short machine-readable category for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedPhase(_) => "unsupported_phase",
            Self::InvalidEvent(_) => "invalid_event",
            Self::Password(_) => "password",
            Self::Secrets(SecretsError::NotFound { .. }) => "not_found",
            Self::Secrets(SecretsError::MalformedPayload { .. }) => "malformed_payload",
            Self::Secrets(SecretsError::AlreadyCurrent { .. }) => "already_current",
            Self::Secrets(SecretsError::Backend { .. }) => "store",
            Self::Database(DatabaseError::Connection { .. }) => "connection",
            Self::Database(DatabaseError::Authentication { .. }) => "authentication",
            Self::Database(DatabaseError::Statement { .. }) => "statement",
        }
    }
}

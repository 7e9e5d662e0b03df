//! Versioned credential storage for rotation.
//!
//! A secret is a set of versions, each holding a JSON [`CredentialRecord`].
//! Versions carry stage labels: `CURRENT` marks the trusted credential,
//! `PENDING` the candidate being rotated in, `PREVIOUS` the credential that
//! was `CURRENT` before the last promotion.
//!
//! # Architecture
//!
//! - [`backends::SecretStoreBackend`] stores raw versions and moves labels
//!   atomically. [`InMemorySecretBackend`] and [`PostgresSecretBackend`]
//!   implement it.
//! - [`CredentialStore`] is the credential-level contract the rotation
//!   coordinator uses. [`CredentialStoreClient`] implements it over any
//!   backend, parsing and validating payloads on the way out.
//! - [`password`] generates candidate passwords.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use secret_rotator::secrets::{CredentialStore, CredentialStoreClient, InMemorySecretBackend, StageLabel};
//!
//! let backend = InMemorySecretBackend::new();
//! let store = CredentialStoreClient::new(Arc::new(backend));
//! let current = store.get_credential("prod/app-db", StageLabel::Current).await?;
//! ```

pub mod backends;
pub mod client;
pub mod credential;
pub mod error;
pub mod labels;
pub mod password;
pub mod types;

pub use backends::{
    InMemorySecretBackend, PostgresSecretBackend, SecretStoreBackend, StoredVersion,
    VersionSelector,
};
pub use client::{CredentialStore, CredentialStoreClient};
pub use credential::{CredentialRecord, SecretDescription, StagedCredential};
pub use error::{Result, SecretsError};
pub use labels::{LabelRegister, Reassignment, StageLabel};
pub use password::{PasswordError, PasswordPolicy};
pub use types::SecretString;

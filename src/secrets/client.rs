//! Credential store client: typed credential operations over a versioned backend.

use async_trait::async_trait;
use std::sync::Arc;

use super::backends::{SecretStoreBackend, VersionSelector};
use super::credential::{CredentialRecord, SecretDescription, StagedCredential};
use super::error::{Result, SecretsError};
use super::labels::{Reassignment, StageLabel};

/// Credential-level operations the rotation coordinator relies on.
///
/// # Errors
///
/// - [`SecretsError::NotFound`] when the secret, label or version is missing
/// - [`SecretsError::MalformedPayload`] when a stored value is not a valid
///   [`CredentialRecord`]
/// - [`SecretsError::AlreadyCurrent`] from [`CredentialStore::promote`] when
///   the version already holds `CURRENT`
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the credential carrying `stage`.
    async fn get_credential(&self, secret_id: &str, stage: StageLabel) -> Result<StagedCredential>;

    /// Fetch a credential by version id.
    async fn get_version(&self, secret_id: &str, version_id: &str) -> Result<StagedCredential>;

    /// Store `record` as `version_id` and label it `PENDING`.
    ///
    /// Repeating the call with the same version id and content issues no
    /// write.
    async fn put_candidate(
        &self,
        secret_id: &str,
        version_id: &str,
        record: &CredentialRecord,
    ) -> Result<()>;

    /// Move `CURRENT` to `version_id`, removing its `PENDING` label in the
    /// same assignment. The displaced version becomes `PREVIOUS`.
    async fn promote(&self, secret_id: &str, version_id: &str) -> Result<()>;

    /// Version id → labels for the secret.
    async fn describe(&self, secret_id: &str) -> Result<SecretDescription>;
}

/// [`CredentialStore`] over any [`SecretStoreBackend`].
#[derive(Debug, Clone)]
pub struct CredentialStoreClient {
    backend: Arc<dyn SecretStoreBackend>,
}

impl CredentialStoreClient {
    pub fn new(backend: Arc<dyn SecretStoreBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn SecretStoreBackend> {
        &self.backend
    }

    async fn fetch(&self, secret_id: &str, selector: VersionSelector) -> Result<StagedCredential> {
        let stored = self.backend.get(secret_id, &selector).await?;
        let record = CredentialRecord::parse(secret_id, &stored.secret_string)?;
        Ok(StagedCredential { version_id: stored.version_id, labels: stored.labels, record })
    }
}

#[async_trait]
impl CredentialStore for CredentialStoreClient {
    async fn get_credential(&self, secret_id: &str, stage: StageLabel) -> Result<StagedCredential> {
        self.fetch(secret_id, VersionSelector::Stage(stage)).await
    }

    async fn get_version(&self, secret_id: &str, version_id: &str) -> Result<StagedCredential> {
        self.fetch(secret_id, VersionSelector::Version(version_id.to_string())).await
    }

    async fn put_candidate(
        &self,
        secret_id: &str,
        version_id: &str,
        record: &CredentialRecord,
    ) -> Result<()> {
        match self.get_version(secret_id, version_id).await {
            Ok(existing) if existing.has_label(StageLabel::Pending) && existing.record == *record => {
                tracing::debug!(
                    secret_id = %secret_id,
                    version_id = %version_id,
                    "Candidate already staged with identical content"
                );
                return Ok(());
            }
            Ok(existing) if existing.has_label(StageLabel::Current) => {
                // Overwriting the trusted version would desynchronize it from the database.
                return Err(SecretsError::already_current(secret_id, version_id));
            }
            Ok(_) | Err(SecretsError::NotFound { .. }) | Err(SecretsError::MalformedPayload { .. }) => {}
            Err(e) => return Err(e),
        }

        let value = record.to_secret_string()?;
        self.backend.put(secret_id, version_id, &value, &[StageLabel::Pending]).await?;

        tracing::info!(secret_id = %secret_id, version_id = %version_id, "Staged PENDING candidate");
        Ok(())
    }

    async fn promote(&self, secret_id: &str, version_id: &str) -> Result<()> {
        let description = self.backend.describe(secret_id).await?;

        if description.labels_of(version_id).contains(&StageLabel::Current) {
            return Err(SecretsError::already_current(secret_id, version_id));
        }
        if !description.contains_version(version_id) {
            return Err(SecretsError::not_found(secret_id, format!("version {}", version_id)));
        }

        match self.backend.reassign_label(secret_id, StageLabel::Current, version_id).await? {
            Reassignment::Moved { displaced } => {
                tracing::info!(
                    secret_id = %secret_id,
                    version_id = %version_id,
                    demoted = ?displaced,
                    "Promoted version to CURRENT"
                );
                Ok(())
            }
            // Another caller promoted it between describe and reassign.
            Reassignment::Unchanged => Err(SecretsError::already_current(secret_id, version_id)),
        }
    }

    async fn describe(&self, secret_id: &str) -> Result<SecretDescription> {
        self.backend.describe(secret_id).await
    }
}

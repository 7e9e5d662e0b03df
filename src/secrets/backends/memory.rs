//! In-process secret store backend.
//!
//! Holds every secret in a `tokio::sync::RwLock`-guarded map. Writes take the
//! lock for the whole version-plus-register update, which gives the same
//! atomicity the Postgres backend gets from a transaction.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::backend::{SecretStoreBackend, StoredVersion, VersionSelector};
use crate::secrets::credential::{CredentialRecord, SecretDescription};
use crate::secrets::error::{Result, SecretsError};
use crate::secrets::labels::{LabelRegister, Reassignment, StageLabel};
use crate::secrets::types::SecretString;

#[derive(Debug, Default, Clone)]
struct SecretEntry {
    versions: HashMap<String, SecretString>,
    labels: LabelRegister,
}

/// Process-local versioned store.
///
/// Cloning shares the underlying map.
#[derive(Debug, Default, Clone)]
pub struct InMemorySecretBackend {
    secrets: Arc<RwLock<HashMap<String, SecretEntry>>>,
    writes: Arc<std::sync::atomic::AtomicU64>,
}

impl InMemorySecretBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `record` as the `CURRENT` version of `secret_id`.
    pub async fn seed(
        &self,
        secret_id: &str,
        version_id: &str,
        record: &CredentialRecord,
    ) -> Result<()> {
        let value = record.to_secret_string()?;
        self.put(secret_id, version_id, &value, &[StageLabel::Current]).await
    }

    /// Number of mutating calls that changed state. Lets tests assert that an
    /// idempotent call issued no write.
    pub fn write_count(&self) -> u64 {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Raw label register for a secret.
    pub async fn labels(&self, secret_id: &str) -> Option<LabelRegister> {
        self.secrets.read().await.get(secret_id).map(|entry| entry.labels.clone())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl SecretStoreBackend for InMemorySecretBackend {
    async fn get(&self, secret_id: &str, selector: &VersionSelector) -> Result<StoredVersion> {
        let secrets = self.secrets.read().await;
        let entry = secrets
            .get(secret_id)
            .ok_or_else(|| SecretsError::not_found(secret_id, selector.to_string()))?;

        let version_id = match selector {
            VersionSelector::Stage(label) => entry.labels.holder(*label),
            VersionSelector::Version(id) => Some(id.as_str()),
        }
        .ok_or_else(|| SecretsError::not_found(secret_id, selector.to_string()))?;

        let secret_string = entry
            .versions
            .get(version_id)
            .ok_or_else(|| SecretsError::not_found(secret_id, selector.to_string()))?;

        Ok(StoredVersion {
            version_id: version_id.to_string(),
            secret_string: secret_string.clone(),
            labels: entry.labels.labels_of(version_id),
        })
    }

    async fn put(
        &self,
        secret_id: &str,
        version_id: &str,
        secret_string: &SecretString,
        labels: &[StageLabel],
    ) -> Result<()> {
        let mut secrets = self.secrets.write().await;
        let entry = secrets.entry(secret_id.to_string()).or_default();

        entry.versions.insert(version_id.to_string(), secret_string.clone());
        for label in labels {
            entry.labels.reassign(*label, version_id);
        }
        self.record_write();

        tracing::debug!(
            secret_id = %secret_id,
            version_id = %version_id,
            labels = ?labels,
            "Stored secret version in memory"
        );
        Ok(())
    }

    async fn reassign_label(
        &self,
        secret_id: &str,
        label: StageLabel,
        target_version_id: &str,
    ) -> Result<Reassignment> {
        let mut secrets = self.secrets.write().await;
        let entry = secrets
            .get_mut(secret_id)
            .ok_or_else(|| SecretsError::not_found(secret_id, "secret"))?;

        if !entry.versions.contains_key(target_version_id) {
            return Err(SecretsError::not_found(secret_id, format!("version {}", target_version_id)));
        }

        let outcome = entry.labels.reassign(label, target_version_id);
        if matches!(outcome, Reassignment::Moved { .. }) {
            self.record_write();
        }
        Ok(outcome)
    }

    async fn describe(&self, secret_id: &str) -> Result<SecretDescription> {
        let secrets = self.secrets.read().await;
        let entry =
            secrets.get(secret_id).ok_or_else(|| SecretsError::not_found(secret_id, "secret"))?;

        let mut versions = entry.labels.as_map();
        for version_id in entry.versions.keys() {
            versions.entry(version_id.clone()).or_default();
        }

        Ok(SecretDescription { secret_id: secret_id.to_string(), versions })
    }
}

//! PostgreSQL secret store backend
//!
//! Versions live in `secret_versions`, labels in `secret_stage_labels`. Every
//! write locks the secret's row in `secrets`, loads the label register,
//! applies the change in memory and rewrites the register, all in one
//! transaction.

use async_trait::async_trait;
use sqlx::{FromRow, PgExecutor, Postgres, Transaction};
use tracing::{debug, error, info};

use super::backend::{SecretStoreBackend, StoredVersion, VersionSelector};
use crate::secrets::credential::SecretDescription;
use crate::secrets::error::{Result, SecretsError};
use crate::secrets::labels::{LabelRegister, Reassignment, StageLabel};
use crate::secrets::types::SecretString;
use crate::storage::DbPool;

#[derive(Debug, Clone, FromRow)]
struct VersionRow {
    version_id: String,
    secret_string: String,
}

#[derive(Debug, Clone, FromRow)]
struct LabelRow {
    label: String,
    version_id: String,
}

/// Secret store backed by this crate's own Postgres tables.
#[derive(Debug, Clone)]
pub struct PostgresSecretBackend {
    pool: DbPool,
}

impl PostgresSecretBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_register<'e, E>(executor: E, secret_id: &str) -> Result<LabelRegister>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, LabelRow>(
            "SELECT label, version_id FROM secret_stage_labels WHERE secret_id = $1",
        )
        .bind(secret_id)
        .fetch_all(executor)
        .await?;

        let mut register = LabelRegister::default();
        for row in rows {
            let label: StageLabel = row
                .label
                .parse()
                .map_err(|reason: String| SecretsError::malformed(secret_id, reason))?;
            register.restore(label, row.version_id);
        }
        Ok(register)
    }

    /// Locks the secret for the rest of the transaction. Returns `false` when
    /// the secret does not exist.
    async fn lock_secret(tx: &mut Transaction<'_, Postgres>, secret_id: &str) -> Result<bool> {
        let locked: Option<(String,)> =
            sqlx::query_as("SELECT secret_id FROM secrets WHERE secret_id = $1 FOR UPDATE")
                .bind(secret_id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(locked.is_some())
    }

    async fn write_register(
        tx: &mut Transaction<'_, Postgres>,
        secret_id: &str,
        register: &LabelRegister,
    ) -> Result<()> {
        sqlx::query("DELETE FROM secret_stage_labels WHERE secret_id = $1")
            .bind(secret_id)
            .execute(&mut **tx)
            .await?;

        for label in StageLabel::ALL {
            if let Some(version_id) = register.holder(label) {
                sqlx::query(
                    "INSERT INTO secret_stage_labels (secret_id, label, version_id, updated_at) VALUES ($1, $2, $3, CURRENT_TIMESTAMP)",
                )
                .bind(secret_id)
                .bind(label.as_str())
                .bind(version_id)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStoreBackend for PostgresSecretBackend {
    async fn get(&self, secret_id: &str, selector: &VersionSelector) -> Result<StoredVersion> {
        debug!(secret_id = %secret_id, selector = %selector, "Fetching secret version from Postgres");

        let row = match selector {
            VersionSelector::Stage(label) => {
                sqlx::query_as::<_, VersionRow>(
                    "SELECT v.version_id, v.secret_string FROM secret_stage_labels l \
                     JOIN secret_versions v ON v.secret_id = l.secret_id AND v.version_id = l.version_id \
                     WHERE l.secret_id = $1 AND l.label = $2",
                )
                .bind(secret_id)
                .bind(label.as_str())
                .fetch_optional(&self.pool)
                .await
            }
            VersionSelector::Version(version_id) => {
                sqlx::query_as::<_, VersionRow>(
                    "SELECT version_id, secret_string FROM secret_versions WHERE secret_id = $1 AND version_id = $2",
                )
                .bind(secret_id)
                .bind(version_id)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            error!(secret_id = %secret_id, error = %e, "Secret version query failed");
            SecretsError::from(e)
        })?
        .ok_or_else(|| SecretsError::not_found(secret_id, selector.to_string()))?;

        let register = Self::load_register(&self.pool, secret_id).await?;

        Ok(StoredVersion {
            labels: register.labels_of(&row.version_id),
            version_id: row.version_id,
            secret_string: SecretString::new(row.secret_string),
        })
    }

    async fn put(
        &self,
        secret_id: &str,
        version_id: &str,
        secret_string: &SecretString,
        labels: &[StageLabel],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO secrets (secret_id) VALUES ($1) ON CONFLICT (secret_id) DO NOTHING")
            .bind(secret_id)
            .execute(&mut *tx)
            .await?;
        Self::lock_secret(&mut tx, secret_id).await?;

        sqlx::query(
            "INSERT INTO secret_versions (secret_id, version_id, secret_string) VALUES ($1, $2, $3) \
             ON CONFLICT (secret_id, version_id) DO UPDATE \
             SET secret_string = EXCLUDED.secret_string, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(secret_id)
        .bind(version_id)
        .bind(secret_string.expose_secret())
        .execute(&mut *tx)
        .await?;

        if !labels.is_empty() {
            let mut register = Self::load_register(&mut *tx, secret_id).await?;
            for label in labels {
                register.reassign(*label, version_id);
            }
            Self::write_register(&mut tx, secret_id, &register).await?;
        }

        tx.commit().await?;

        info!(
            secret_id = %secret_id,
            version_id = %version_id,
            labels = ?labels,
            "Stored secret version in Postgres"
        );
        Ok(())
    }

    async fn reassign_label(
        &self,
        secret_id: &str,
        label: StageLabel,
        target_version_id: &str,
    ) -> Result<Reassignment> {
        let mut tx = self.pool.begin().await?;

        if !Self::lock_secret(&mut tx, secret_id).await? {
            return Err(SecretsError::not_found(secret_id, "secret"));
        }

        let exists: Option<(String,)> = sqlx::query_as(
            "SELECT version_id FROM secret_versions WHERE secret_id = $1 AND version_id = $2",
        )
        .bind(secret_id)
        .bind(target_version_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(SecretsError::not_found(secret_id, format!("version {}", target_version_id)));
        }

        let mut register = Self::load_register(&mut *tx, secret_id).await?;
        let outcome = register.reassign(label, target_version_id);

        if matches!(outcome, Reassignment::Moved { .. }) {
            Self::write_register(&mut tx, secret_id, &register).await?;
            tx.commit().await?;
            info!(
                secret_id = %secret_id,
                label = %label,
                version_id = %target_version_id,
                "Reassigned stage label"
            );
        } else {
            tx.rollback().await?;
        }

        Ok(outcome)
    }

    async fn describe(&self, secret_id: &str) -> Result<SecretDescription> {
        let version_ids: Vec<(String,)> = sqlx::query_as(
            "SELECT version_id FROM secret_versions WHERE secret_id = $1 ORDER BY created_at",
        )
        .bind(secret_id)
        .fetch_all(&self.pool)
        .await?;

        if version_ids.is_empty() {
            return Err(SecretsError::not_found(secret_id, "secret"));
        }

        let register = Self::load_register(&self.pool, secret_id).await?;
        let mut versions = register.as_map();
        for (version_id,) in version_ids {
            versions.entry(version_id).or_default();
        }

        Ok(SecretDescription { secret_id: secret_id.to_string(), versions })
    }
}

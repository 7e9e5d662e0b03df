//! # Rotation Coordinator
//!
//! Runs one phase per call. Nothing is carried between calls: every phase
//! reloads the secret's labels, plans against them and then acts.

use std::time::Instant;
use tracing::{error, info, warn, Instrument};

use super::error::{Result, RotationError};
use super::event::{Phase, RotationEvent};
use super::plan::{plan, PhaseAction, SecretSnapshot};
use crate::config::DatabaseSettings;
use crate::database::{with_session, ConnectionParams, DatabaseConnector, DatabaseError};
use crate::observability::metrics::record_phase;
use crate::secrets::{
    CredentialStore, PasswordPolicy, SecretsError, StageLabel, StagedCredential,
};

/// Result of a phase that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// The phase changed the store or the database.
    Applied,
    /// The phase found its work already done.
    AlreadyApplied,
}

impl PhaseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadyApplied => "noop",
        }
    }
}

/// Four-phase rotation over a credential store and a database connector.
pub struct RotationCoordinator<S, D> {
    store: S,
    connector: D,
    password_policy: PasswordPolicy,
    database: DatabaseSettings,
}

impl<S, D> RotationCoordinator<S, D>
where
    S: CredentialStore,
    D: DatabaseConnector,
{
    pub fn new(
        store: S,
        connector: D,
        password_policy: PasswordPolicy,
        database: DatabaseSettings,
    ) -> Self {
        Self { store, connector, password_policy, database }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle one rotation event.
    pub async fn handle(&self, event: &RotationEvent) -> Result<PhaseOutcome> {
        let span = crate::rotation_span!(
            event.phase,
            event.secret_id,
            version_id = %event.request_token
        );

        async {
            let started = Instant::now();
            let result = self.run_phase(event).await;
            let phase_label = event.phase().map(|p| p.as_str()).unwrap_or("unsupported");

            match &result {
                Ok(outcome) => {
                    record_phase(phase_label, outcome.as_str(), started.elapsed());
                    info!(outcome = outcome.as_str(), "Rotation phase finished");
                }
                Err(e) => {
                    record_phase(phase_label, "error", started.elapsed());
                    error!(
                        error = %e,
                        kind = e.kind(),
                        retryable = e.is_retryable(),
                        "Rotation phase failed"
                    );
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Run all four phases with a fresh request token. Stops at the first
    /// failure and returns the token that was used.
    pub async fn rotate_now(&self, secret_id: &str) -> Result<String> {
        let token = uuid::Uuid::new_v4().to_string();
        info!(secret_id = %secret_id, version_id = %token, "Starting full rotation");

        for phase in Phase::ALL {
            self.handle(&RotationEvent::for_phase(phase, secret_id, &token)).await?;
        }

        info!(secret_id = %secret_id, version_id = %token, "Full rotation complete");
        Ok(token)
    }

    async fn run_phase(&self, event: &RotationEvent) -> Result<PhaseOutcome> {
        event.check()?;

        let description = self.store.describe(&event.secret_id).await?;
        let snapshot = SecretSnapshot::new(description);
        let action = plan(&snapshot, event)?;

        match action {
            PhaseAction::AlreadyComplete => {
                info!("Request token already promoted, nothing to do");
                Ok(PhaseOutcome::AlreadyApplied)
            }
            PhaseAction::CandidateStaged => {
                info!("Candidate already staged for this request token");
                Ok(PhaseOutcome::AlreadyApplied)
            }
            PhaseAction::StageCandidate { current } => {
                self.stage_candidate(event, &current).await
            }
            PhaseAction::ApplyCandidate { current } => {
                self.apply_candidate(event, &current).await
            }
            PhaseAction::VerifyCandidate => self.verify_candidate(event).await,
            PhaseAction::Promote => self.promote(event).await,
        }
    }

    async fn stage_candidate(&self, event: &RotationEvent, current: &str) -> Result<PhaseOutcome> {
        let current = self.store.get_version(&event.secret_id, current).await?;
        let password = self.password_policy.generate()?;
        let candidate = current.record.with_password(password);

        self.store.put_candidate(&event.secret_id, &event.request_token, &candidate).await?;
        info!(derived_from = %current.version_id, "Staged candidate credential");
        Ok(PhaseOutcome::Applied)
    }

    async fn apply_candidate(&self, event: &RotationEvent, current: &str) -> Result<PhaseOutcome> {
        let pending = self.pending_for(event).await?;
        let current = self.store.get_version(&event.secret_id, current).await?;

        // The statement is issued on every delivery. Once an earlier delivery
        // has changed the password, CURRENT no longer authenticates and the
        // candidate sets its own (unchanged) password instead.
        let current_params = ConnectionParams::from_record(&current.record, &self.database);
        let authenticated_as = match self.set_password_as(&current_params, &pending).await {
            Ok(()) => &current.version_id,
            Err(DatabaseError::Authentication { .. }) => {
                warn!("CURRENT credential rejected, re-applying as the candidate");
                let pending_params = ConnectionParams::from_record(&pending.record, &self.database);
                self.set_password_as(&pending_params, &pending).await?;
                &pending.version_id
            }
            Err(e) => return Err(e.into()),
        };

        info!(authenticated_as = %authenticated_as, "Applied candidate password to database");
        Ok(PhaseOutcome::Applied)
    }

    async fn set_password_as(
        &self,
        params: &ConnectionParams,
        candidate: &StagedCredential,
    ) -> crate::database::Result<()> {
        let username = candidate.record.username.clone();
        let password = candidate.record.password.clone();

        with_session(&self.connector, params, move |session| {
            Box::pin(async move { session.set_password(&username, &password).await })
        })
        .await
    }

    async fn verify_candidate(&self, event: &RotationEvent) -> Result<PhaseOutcome> {
        let pending = self.pending_for(event).await?;
        let params = ConnectionParams::from_record(&pending.record, &self.database);

        with_session(&self.connector, &params, |session| {
            Box::pin(async move { session.probe().await })
        })
        .await?;

        info!("Candidate credential authenticated");
        Ok(PhaseOutcome::Applied)
    }

    async fn promote(&self, event: &RotationEvent) -> Result<PhaseOutcome> {
        match self.store.promote(&event.secret_id, &event.request_token).await {
            Ok(()) => Ok(PhaseOutcome::Applied),
            Err(SecretsError::AlreadyCurrent { .. }) => {
                warn!("Version already CURRENT, treating finish as complete");
                Ok(PhaseOutcome::AlreadyApplied)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches `PENDING` and checks it still belongs to this request.
    async fn pending_for(&self, event: &RotationEvent) -> Result<StagedCredential> {
        let pending = self.store.get_credential(&event.secret_id, StageLabel::Pending).await?;
        if pending.version_id != event.request_token {
            return Err(RotationError::Secrets(SecretsError::not_found(
                &event.secret_id,
                format!("stage PENDING on version {}", event.request_token),
            )));
        }
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{AdminSession, ConnectionParams};
    use crate::secrets::{
        CredentialRecord, CredentialStoreClient, InMemorySecretBackend, SecretDescription,
    };
    use std::sync::Arc;
    use tracing_test::traced_test;

    /// Connector for phases that must not reach the database.
    struct Unreachable;

    #[async_trait::async_trait]
    impl DatabaseConnector for Unreachable {
        async fn connect(
            &self,
            params: &ConnectionParams,
        ) -> crate::database::Result<Box<dyn AdminSession>> {
            Err(DatabaseError::connection(&params.host, "connection refused"))
        }
    }

    async fn coordinator() -> RotationCoordinator<CredentialStoreClient, Unreachable> {
        let backend = InMemorySecretBackend::new();
        backend
            .seed("prod/app-db", "v1", &CredentialRecord::new("app", "old1", "db"))
            .await
            .unwrap();
        RotationCoordinator::new(
            CredentialStoreClient::new(Arc::new(backend)),
            Unreachable,
            PasswordPolicy::default(),
            DatabaseSettings::default(),
        )
    }

    #[tokio::test]
    #[traced_test]
    async fn test_create_never_logs_the_candidate_password() {
        let coordinator = coordinator().await;
        coordinator.handle(&RotationEvent::new("create", "prod/app-db", "tok1")).await.unwrap();

        let candidate = coordinator.store().get_version("prod/app-db", "tok1").await.unwrap();
        assert!(logs_contain("Staged candidate credential"));
        assert!(!logs_contain(candidate.record.password.expose_secret()));
        assert!(!logs_contain("old1"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failure_is_logged_with_phase_and_secret() {
        let coordinator = coordinator().await;
        coordinator.handle(&RotationEvent::new("create", "prod/app-db", "tok1")).await.unwrap();

        let err = coordinator
            .handle(&RotationEvent::new("test", "prod/app-db", "tok1"))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(logs_contain("Rotation phase failed"));
        assert!(logs_contain("phase=test"));
        assert!(logs_contain("secret_id=prod/app-db"));
        assert!(logs_contain("kind=\"connection\""));
    }

    /// Store whose `promote` loses a race with another finish for the same
    /// token, after `describe` still showed the token as `PENDING`.
    struct RacedPromotion(CredentialStoreClient);

    #[async_trait::async_trait]
    impl CredentialStore for RacedPromotion {
        async fn get_credential(
            &self,
            secret_id: &str,
            stage: StageLabel,
        ) -> crate::secrets::Result<StagedCredential> {
            self.0.get_credential(secret_id, stage).await
        }

        async fn get_version(
            &self,
            secret_id: &str,
            version_id: &str,
        ) -> crate::secrets::Result<StagedCredential> {
            self.0.get_version(secret_id, version_id).await
        }

        async fn put_candidate(
            &self,
            secret_id: &str,
            version_id: &str,
            record: &CredentialRecord,
        ) -> crate::secrets::Result<()> {
            self.0.put_candidate(secret_id, version_id, record).await
        }

        async fn promote(&self, secret_id: &str, version_id: &str) -> crate::secrets::Result<()> {
            Err(SecretsError::already_current(secret_id, version_id))
        }

        async fn describe(&self, secret_id: &str) -> crate::secrets::Result<SecretDescription> {
            self.0.describe(secret_id).await
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_finish_losing_promotion_race_is_success() {
        let backend = InMemorySecretBackend::new();
        backend
            .seed("prod/app-db", "v1", &CredentialRecord::new("app", "old1", "db"))
            .await
            .unwrap();
        let client = CredentialStoreClient::new(Arc::new(backend));
        client
            .put_candidate(
                "prod/app-db",
                "tok1",
                &CredentialRecord::new("app", "new1", "db"),
            )
            .await
            .unwrap();

        let coordinator = RotationCoordinator::new(
            RacedPromotion(client),
            Unreachable,
            PasswordPolicy::default(),
            DatabaseSettings::default(),
        );

        let outcome =
            coordinator.handle(&RotationEvent::new("finish", "prod/app-db", "tok1")).await.unwrap();

        assert_eq!(outcome, PhaseOutcome::AlreadyApplied);
        assert!(logs_contain("Version already CURRENT"));
    }

    #[tokio::test]
    async fn test_invalid_event_fails_before_store_access() {
        let coordinator = coordinator().await;
        let err = coordinator
            .handle(&RotationEvent::new("create", "missing/secret", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, RotationError::InvalidEvent(_)));
    }
}

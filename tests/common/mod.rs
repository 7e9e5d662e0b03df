//! Common test utilities for all integration tests.
//!
//! Provides an in-process stand-in for the target database and helpers to
//! build a coordinator over the in-memory secret store.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

#[cfg(feature = "postgres_tests")]
pub mod test_db;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use secret_rotator::config::DatabaseSettings;
use secret_rotator::database::{AdminSession, ConnectionParams, DatabaseConnector, DatabaseError};
use secret_rotator::rotation::RotationCoordinator;
use secret_rotator::secrets::{
    CredentialRecord, CredentialStoreClient, InMemorySecretBackend, PasswordPolicy, SecretString,
};

pub const SECRET_ID: &str = "prod/app-db";

#[derive(Default)]
struct FakeState {
    passwords: Mutex<HashMap<String, String>>,
    unreachable: AtomicBool,
    trust_auth: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
    password_changes: AtomicUsize,
}

/// Database that authenticates against an in-memory user table.
///
/// Clones share state, so a test can keep one handle while the coordinator
/// owns another.
#[derive(Clone, Default)]
pub struct FakeDatabase {
    state: Arc<FakeState>,
}

impl FakeDatabase {
    pub fn with_user(username: &str, password: &str) -> Self {
        let db = Self::default();
        db.state
            .passwords
            .lock()
            .unwrap()
            .insert(username.to_string(), password.to_string());
        db
    }

    pub fn password_of(&self, username: &str) -> Option<String> {
        self.state.passwords.lock().unwrap().get(username).cloned()
    }

    /// Makes every connection attempt fail with a connection error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Accepts any password for a known role, like a `trust` pg_hba rule.
    pub fn set_trust_auth(&self, trust: bool) {
        self.state.trust_auth.store(trust, Ordering::SeqCst);
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn password_changes(&self) -> usize {
        self.state.password_changes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseConnector for FakeDatabase {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn AdminSession>, DatabaseError> {
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(DatabaseError::connection(&params.host, "connection refused"));
        }

        let trust = self.state.trust_auth.load(Ordering::SeqCst);
        let accepted = self
            .state
            .passwords
            .lock()
            .unwrap()
            .get(&params.username)
            .is_some_and(|stored| trust || stored == params.password.expose_secret());
        if !accepted {
            return Err(DatabaseError::authentication(
                &params.username,
                "password authentication failed",
            ));
        }

        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession { state: self.state.clone() }))
    }
}

struct FakeSession {
    state: Arc<FakeState>,
}

#[async_trait]
impl AdminSession for FakeSession {
    async fn execute(&mut self, statement: &str) -> Result<u64, DatabaseError> {
        Err(DatabaseError::statement(format!("unsupported statement: {}", statement)))
    }

    async fn set_password(
        &mut self,
        username: &str,
        password: &SecretString,
    ) -> Result<(), DatabaseError> {
        let mut passwords = self.state.passwords.lock().unwrap();
        match passwords.get_mut(username) {
            Some(stored) => {
                *stored = password.expose_secret().to_string();
                self.state.password_changes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(DatabaseError::statement(format!("role \"{}\" does not exist", username))),
        }
    }

    async fn probe(&mut self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DatabaseError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// `{username: "app", password: "old1", host: "db", port: 5432}`
pub fn initial_record() -> CredentialRecord {
    CredentialRecord::new("app", "old1", "db").with_port(5432)
}

pub struct Harness {
    pub backend: InMemorySecretBackend,
    pub db: FakeDatabase,
    pub coordinator: RotationCoordinator<CredentialStoreClient, FakeDatabase>,
}

/// Store seeded with [`initial_record`] as `CURRENT` version `v1`, and a
/// database that accepts it.
pub async fn harness() -> Harness {
    let backend = InMemorySecretBackend::new();
    backend.seed(SECRET_ID, "v1", &initial_record()).await.unwrap();

    let db = FakeDatabase::with_user("app", "old1");
    let store = CredentialStoreClient::new(Arc::new(backend.clone()));
    let coordinator = RotationCoordinator::new(
        store,
        db.clone(),
        PasswordPolicy::default(),
        DatabaseSettings::default(),
    );

    Harness { backend, db, coordinator }
}

//! # Administrative Sessions
//!
//! A session is a single short-lived connection opened with one credential.
//! Callers never hold a session directly: [`with_session`] opens it, hands it
//! to a closure and closes it whichever way the closure returns.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::time::Duration;

use super::error::Result;
use crate::config::DatabaseSettings;
use crate::secrets::{CredentialRecord, SecretString};

/// Everything needed to open one connection.
#[derive(Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub username: String,
    pub password: SecretString,
    pub connect_timeout: Duration,
    pub require_tls: bool,
}

impl ConnectionParams {
    /// Connection parameters for the credential in `record`, with defaults
    /// applied for a missing port or database name.
    pub fn from_record(record: &CredentialRecord, settings: &DatabaseSettings) -> Self {
        Self {
            host: record.host.clone(),
            port: record.port_or_default(),
            dbname: record.dbname_or_default().to_string(),
            username: record.username.clone(),
            password: record.password.clone(),
            connect_timeout: settings.connect_timeout(),
            require_tls: settings.require_tls,
        }
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .field("password", &self.password)
            .field("connect_timeout", &self.connect_timeout)
            .field("require_tls", &self.require_tls)
            .finish()
    }
}

/// An open administrative connection.
#[async_trait]
pub trait AdminSession: Send {
    /// Run one statement, returning the number of rows affected.
    async fn execute(&mut self, statement: &str) -> Result<u64>;

    /// Change `username`'s password to `password`.
    async fn set_password(&mut self, username: &str, password: &SecretString) -> Result<()>;

    /// `SELECT 1`. Succeeds only if the connection is usable.
    async fn probe(&mut self) -> Result<()>;

    /// Terminate the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens [`AdminSession`]s.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn AdminSession>>;
}

/// Opens a session, runs `body` on it and closes it.
///
/// The session is closed whether `body` succeeds or fails. If the returned
/// future is dropped before completion the connection is released when the
/// boxed session drops. A failure to close after `body` has finished is
/// logged and does not change the result.
pub async fn with_session<C, T, F>(connector: &C, params: &ConnectionParams, body: F) -> Result<T>
where
    C: DatabaseConnector + ?Sized,
    T: Send,
    F: for<'s> FnOnce(&'s mut dyn AdminSession) -> BoxFuture<'s, Result<T>> + Send,
{
    let mut session = connector.connect(params).await?;
    tracing::debug!(host = %params.host, username = %params.username, "Database session opened");

    let outcome = body(session.as_mut()).await;

    if let Err(e) = session.close().await {
        tracing::warn!(host = %params.host, error = %e, "Failed to close database session cleanly");
    } else {
        tracing::debug!(host = %params.host, "Database session closed");
    }

    outcome
}

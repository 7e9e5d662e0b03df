//! PostgreSQL administrative sessions over a single `PgConnection`.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{Connection, Executor};
use zeroize::Zeroizing;

use super::error::{DatabaseError, Result};
use super::session::{AdminSession, ConnectionParams, DatabaseConnector};
use crate::secrets::SecretString;

/// Opens one unpooled connection per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

impl PgConnector {
    pub fn new() -> Self {
        Self
    }

    fn connect_options(params: &ConnectionParams) -> PgConnectOptions {
        let ssl_mode = if params.require_tls { PgSslMode::Require } else { PgSslMode::Prefer };

        PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.dbname)
            .username(&params.username)
            .password(params.password.expose_secret())
            .ssl_mode(ssl_mode)
            .application_name("secret-rotator")
    }
}

#[async_trait]
impl DatabaseConnector for PgConnector {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn AdminSession>> {
        let options = Self::connect_options(params);

        tracing::debug!(
            host = %params.host,
            port = params.port,
            dbname = %params.dbname,
            username = %params.username,
            require_tls = params.require_tls,
            "Connecting to database"
        );

        let conn = tokio::time::timeout(params.connect_timeout, PgConnection::connect_with(&options))
            .await
            .map_err(|_| {
                DatabaseError::connection(
                    &params.host,
                    format!("timed out after {}s", params.connect_timeout.as_secs()),
                )
            })?
            .map_err(|e| DatabaseError::from_sqlx(e, &params.host, &params.username))?;

        Ok(Box::new(PgAdminSession {
            conn,
            host: params.host.clone(),
            username: params.username.clone(),
        }))
    }
}

pub struct PgAdminSession {
    conn: PgConnection,
    host: String,
    username: String,
}

impl PgAdminSession {
    fn map_err(&self, err: sqlx::Error) -> DatabaseError {
        DatabaseError::from_sqlx(err, &self.host, &self.username)
    }
}

#[async_trait]
impl AdminSession for PgAdminSession {
    async fn execute(&mut self, statement: &str) -> Result<u64> {
        match self.conn.execute(statement).await {
            Ok(done) => Ok(done.rows_affected()),
            Err(e) => Err(self.map_err(e)),
        }
    }

    async fn set_password(&mut self, username: &str, password: &SecretString) -> Result<()> {
        // ALTER USER takes no bind parameters; let the server quote both values.
        let quoted: (String, String) = match sqlx::query_as("SELECT quote_ident($1), quote_literal($2)")
            .bind(username)
            .bind(password.expose_secret())
            .fetch_one(&mut self.conn)
            .await
        {
            Ok(row) => row,
            Err(e) => return Err(self.map_err(e)),
        };
        let (identifier, literal) = (quoted.0, Zeroizing::new(quoted.1));

        let statement = Zeroizing::new(format!("ALTER USER {} WITH PASSWORD {}", identifier, *literal));
        if let Err(e) = self.conn.execute(statement.as_str()).await {
            return Err(self.map_err(e));
        }

        tracing::info!(host = %self.host, username = %username, "Database password changed");
        Ok(())
    }

    async fn probe(&mut self) -> Result<()> {
        match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&mut self.conn).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.map_err(e)),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let PgAdminSession { conn, host, username } = *self;
        conn.close().await.map_err(|e| DatabaseError::from_sqlx(e, &host, &username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseSettings;
    use crate::secrets::CredentialRecord;

    #[test]
    fn test_connect_options_follow_params() {
        let record = CredentialRecord::new("app", "old1", "db.internal")
            .with_port(6432)
            .with_dbname("orders");
        let settings = DatabaseSettings { require_tls: true, ..Default::default() };
        let options = PgConnector::connect_options(&ConnectionParams::from_record(&record, &settings));

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6432);
        assert_eq!(options.get_database(), Some("orders"));
        assert_eq!(options.get_username(), "app");
        assert!(matches!(options.get_ssl_mode(), PgSslMode::Require));
    }

    #[tokio::test]
    async fn test_connect_refused_is_transient() {
        // Port 1 on loopback is closed in any test environment.
        let record = CredentialRecord::new("app", "old1", "127.0.0.1").with_port(1);
        let params = ConnectionParams::from_record(&record, &DatabaseSettings::default());

        let err = match PgConnector::new().connect(&params).await {
            Ok(_) => panic!("connection to a closed port succeeded"),
            Err(e) => e,
        };
        assert!(err.is_transient(), "unexpected error: {err}");
    }
}

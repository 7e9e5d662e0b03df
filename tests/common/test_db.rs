//! PostgreSQL test databases backed by Testcontainers.
//!
//! Each `TestDatabase` starts a fresh container with the secret store
//! migrations applied. The same container doubles as the rotation target:
//! tests create a login role in it and rotate that role's password.

#![allow(clippy::duplicate_mod)]

use secret_rotator::config::StoreConfig;
use secret_rotator::storage::{create_pool, DbPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

/// A Postgres container plus a migrated store pool.
///
/// The container is stopped and removed when this struct is dropped.
pub struct TestDatabase {
    pub pool: DbPool,
    pub host: String,
    pub port: u16,
    _container: ContainerAsync<Postgres>,
}

impl TestDatabase {
    pub async fn new(prefix: &str) -> Self {
        let container = Postgres::default().start().await.unwrap_or_else(|e| {
            panic!("Failed to start PostgreSQL container for {}: {}", prefix, e)
        });

        let host = container
            .get_host()
            .await
            .unwrap_or_else(|e| panic!("Failed to get container host for {}: {}", prefix, e))
            .to_string();

        let port = container
            .get_host_port_ipv4(5432)
            .await
            .unwrap_or_else(|e| panic!("Failed to get container port for {}: {}", prefix, e));

        let config = StoreConfig {
            url: format!("postgresql://postgres:postgres@{}:{}/postgres", host, port),
            auto_migrate: true,
            max_connections: 4,
            min_connections: 1,
            ..Default::default()
        };

        let pool = create_pool(&config)
            .await
            .unwrap_or_else(|e| panic!("Failed to create store pool for {}: {}", prefix, e));

        Self { pool, host, port, _container: container }
    }

    /// Creates a login role the tests can rotate.
    pub async fn create_login_role(&self, username: &str, password: &str) {
        let statement = format!("CREATE ROLE {} LOGIN PASSWORD '{}'", username, password);
        sqlx::query(&statement).execute(&self.pool).await.expect("create login role");
    }
}

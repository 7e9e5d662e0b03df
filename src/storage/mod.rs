//! # Secret Store Storage
//!
//! Connection pool and embedded schema migrations for the Postgres-backed
//! secret store.

pub mod migrations;
pub mod pool;

pub use migrations::{
    list_applied_migrations, pending_migration_count, run_migrations, MigrationInfo,
};
pub use pool::{create_pool, DbPool};

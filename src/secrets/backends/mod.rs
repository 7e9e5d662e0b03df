//! Secret store backends
//!
//! ## Supported Backends
//!
//! - **Memory**: process-local store for tests and dry runs
//! - **Postgres**: tables created by this crate's migrations

pub mod backend;
pub mod memory;
pub mod postgres;

pub use backend::{SecretStoreBackend, StoredVersion, VersionSelector};
pub use memory::InMemorySecretBackend;
pub use postgres::PostgresSecretBackend;

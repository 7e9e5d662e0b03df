//! # Target Database Sessions
//!
//! Administrative access to the database whose credential is being rotated.
//! Each rotation phase opens its own session through [`with_session`] and
//! never shares it.

pub mod error;
pub mod postgres;
pub mod session;

pub use error::{DatabaseError, Result};
pub use postgres::{PgAdminSession, PgConnector};
pub use session::{with_session, AdminSession, ConnectionParams, DatabaseConnector};

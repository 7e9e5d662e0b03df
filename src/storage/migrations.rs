//! # Database Migration Management
//!
//! Schema for the Postgres secret store. Migrations are embedded in the binary
//! and tracked in `_rotator_migrations`; each runs in its own transaction.

use crate::errors::{Error, Result};
use crate::storage::DbPool;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::Row;
use tracing::{error, info, warn};

/// Embedded migrations, ordered by filename.
const MIGRATIONS: &[(&str, &str)] = &[(
    "20261019000001_create_secret_versions",
    include_str!("../../migrations/20261019000001_create_secret_versions.sql"),
)];

/// Migration information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationInfo {
    pub version: i64,
    pub description: String,
    pub installed_on: chrono::DateTime<chrono::Utc>,
    pub execution_time: i64,
    pub checksum: Vec<u8>,
}

/// Run all pending database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!("Starting secret store migration process");

    create_migration_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;

    let mut migrations_run = 0;
    for (filename, sql) in MIGRATIONS {
        let version = extract_version_from_filename(filename)?;
        let checksum = calculate_checksum(sql);

        if let Some((_, applied_checksum)) = applied.iter().find(|(v, _)| *v == version) {
            if applied_checksum != &checksum {
                warn!(
                    version = version,
                    expected = %hex::encode(&checksum[..8]),
                    found = %hex::encode(applied_checksum.get(..8).unwrap_or_default()),
                    "Applied migration differs from embedded copy"
                );
            }
            continue;
        }

        info!(version = version, "Running migration: {}", filename);
        let start_time = std::time::Instant::now();

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| Error::database(e, "Failed to start migration transaction"))?;

        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
            error!(error = %e, migration = filename, "Migration failed");
            Error::database(e, format!("Migration failed: {}", filename))
        })?;

        let execution_time = start_time.elapsed().as_millis() as i64;
        sqlx::query(
            "INSERT INTO _rotator_migrations (version, description, checksum, execution_time, installed_on) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(version)
        .bind(*filename)
        .bind(&checksum)
        .bind(execution_time)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::database(e, format!("Failed to record migration: {}", filename)))?;

        tx.commit()
            .await
            .map_err(|e| Error::database(e, "Failed to commit migration transaction"))?;

        migrations_run += 1;
        info!(version = version, execution_time_ms = execution_time, "Migration completed: {}", filename);
    }

    if migrations_run > 0 {
        info!(count = migrations_run, "Secret store migrations completed");
    } else {
        info!("No pending migrations");
    }

    Ok(())
}

/// Create the migration tracking table
async fn create_migration_table(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _rotator_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            checksum BYTEA NOT NULL,
            execution_time BIGINT NOT NULL,
            installed_on TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
    "#,
    )
    .execute(pool)
    .await
    .map_err(|e| Error::database(e, "Failed to create migration tracking table"))?;

    Ok(())
}

async fn get_applied_migrations(pool: &DbPool) -> Result<Vec<(i64, Vec<u8>)>> {
    let rows = sqlx::query("SELECT version, checksum FROM _rotator_migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .map_err(|e| Error::database(e, "Failed to get applied migrations"))?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get::<i64, _>("version"), row.get::<Vec<u8>, _>("checksum")))
        .collect())
}

/// List all applied migrations
pub async fn list_applied_migrations(pool: &DbPool) -> Result<Vec<MigrationInfo>> {
    create_migration_table(pool).await?;

    let rows = sqlx::query(
        "SELECT version, description, checksum, execution_time, installed_on FROM _rotator_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| Error::database(e, "Failed to list applied migrations"))?;

    Ok(rows
        .into_iter()
        .map(|row| MigrationInfo {
            version: row.get("version"),
            description: row.get("description"),
            installed_on: row.get("installed_on"),
            execution_time: row.get("execution_time"),
            checksum: row.get("checksum"),
        })
        .collect())
}

/// Number of embedded migrations not yet applied.
pub async fn pending_migration_count(pool: &DbPool) -> Result<usize> {
    create_migration_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;

    let mut pending = 0;
    for (filename, _) in MIGRATIONS {
        let version = extract_version_from_filename(filename)?;
        if !applied.iter().any(|(v, _)| *v == version) {
            pending += 1;
        }
    }
    Ok(pending)
}

/// Extract version number from migration filename
fn extract_version_from_filename(filename: &str) -> Result<i64> {
    let version_str = filename
        .split('_')
        .next()
        .ok_or_else(|| Error::validation(format!("Invalid migration filename: {}", filename)))?;

    version_str
        .parse::<i64>()
        .map_err(|_| Error::validation(format!("Invalid version in filename: {}", filename)))
}

/// SHA-256 of the migration text
fn calculate_checksum(content: &str) -> Vec<u8> {
    Sha256::digest(content.as_bytes()).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_version_from_filename() {
        assert_eq!(
            extract_version_from_filename("20261019000001_create_secret_versions").unwrap(),
            20261019000001
        );
        assert!(extract_version_from_filename("invalid_filename").is_err());
    }

    #[test]
    fn test_calculate_checksum() {
        let checksum1 = calculate_checksum("CREATE TABLE test (id INTEGER);");
        let checksum2 = calculate_checksum("CREATE TABLE test (id INTEGER);");
        let checksum3 = calculate_checksum("CREATE TABLE other (id INTEGER);");

        assert_eq!(checksum1.len(), 32);
        assert_eq!(checksum1, checksum2);
        assert_ne!(checksum1, checksum3);
    }

    #[test]
    fn test_embedded_migrations_are_ordered() {
        let versions: Vec<i64> =
            MIGRATIONS.iter().map(|(f, _)| extract_version_from_filename(f).unwrap()).collect();
        let mut sorted = versions.clone();
        sorted.sort();
        assert_eq!(versions, sorted);
        assert!(MIGRATIONS[0].1.contains("secret_stage_labels"));
    }
}

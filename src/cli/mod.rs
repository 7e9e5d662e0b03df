//! # Command Line Interface
//!
//! Runs rotation phases against the Postgres secret store and manages the
//! store's schema.

pub mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::RotatorConfig;
use crate::database::PgConnector;
use crate::observability::{describe_metrics, init_logging, log_config_info};
use crate::rotation::{RotationCoordinator, RotationError, RotationEvent};
use crate::secrets::{
    CredentialRecord, CredentialStore, CredentialStoreClient, PostgresSecretBackend,
    SecretStoreBackend, StageLabel,
};
use crate::storage::{
    create_pool, list_applied_migrations, pending_migration_count, run_migrations, DbPool,
};

/// Exit status for failures that may succeed when re-invoked (`EX_TEMPFAIL`).
pub const EXIT_RETRYABLE: u8 = 75;

/// Exit status for failures that need intervention.
pub const EXIT_FATAL: u8 = 1;

#[derive(Parser)]
#[command(name = "secret-rotator")]
#[command(about = "Four-phase PostgreSQL credential rotation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Secret store URL override
    #[arg(long, global = true)]
    pub store_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one rotation phase
    Rotate {
        /// Phase to run: create, set, test or finish
        #[arg(long, required_unless_present = "event")]
        phase: Option<String>,

        /// Secret identifier
        #[arg(long, required_unless_present = "event")]
        secret_id: Option<String>,

        /// Request token identifying this rotation attempt
        #[arg(long, required_unless_present = "event")]
        token: Option<String>,

        /// Read the event as JSON from a file, or `-` for stdin
        #[arg(long, conflicts_with_all = ["phase", "secret_id", "token"])]
        event: Option<PathBuf>,
    },

    /// Run all four phases now with a fresh request token
    RotateNow {
        /// Secret identifier
        secret_id: String,
    },

    /// Show a secret's versions and their stage labels
    Describe {
        /// Secret identifier
        secret_id: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Store a credential as the CURRENT version of a secret
    Import {
        /// Secret identifier
        secret_id: String,

        /// Version id for the imported credential
        #[arg(long, default_value = "initial")]
        version_id: String,

        /// JSON credential file, or `-` for stdin
        #[arg(long)]
        from: PathBuf,
    },

    /// Secret store schema commands
    Database {
        #[command(subcommand)]
        command: DatabaseCommands,
    },
}

#[derive(Subcommand)]
pub enum DatabaseCommands {
    /// Run pending migrations
    Migrate,

    /// Show migration status
    Status,

    /// List all applied migrations
    List,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhaseReport<'a> {
    phase: &'a str,
    secret_id: &'a str,
    request_token: &'a str,
    outcome: &'static str,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = RotatorConfig::from_env()?;
    if let Some(url) = cli.store_url {
        config.store.url = url;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    config.validate()?;

    init_logging(&config.logging);
    describe_metrics();
    log_config_info(&config);

    let pool = create_pool(&config.store).await?;

    match cli.command {
        Commands::Rotate { phase, secret_id, token, event } => {
            let event = match event {
                Some(path) => RotationEvent::from_json(&read_input(&path)?)?,
                None => RotationEvent::new(
                    phase.unwrap_or_default(),
                    secret_id.unwrap_or_default(),
                    token.unwrap_or_default(),
                ),
            };
            let coordinator = coordinator(pool, &config);
            let outcome = coordinator.handle(&event).await?;
            output::print_json(&PhaseReport {
                phase: &event.phase,
                secret_id: &event.secret_id,
                request_token: &event.request_token,
                outcome: outcome.as_str(),
            })?;
        }

        Commands::RotateNow { secret_id } => {
            let coordinator = coordinator(pool, &config);
            let token = coordinator.rotate_now(&secret_id).await?;
            output::print_json(&PhaseReport {
                phase: "finish",
                secret_id: &secret_id,
                request_token: &token,
                outcome: "applied",
            })?;
        }

        Commands::Describe { secret_id, json } => {
            let store = CredentialStoreClient::new(Arc::new(PostgresSecretBackend::new(pool)));
            let description = store.describe(&secret_id).await.map_err(RotationError::from)?;
            if json {
                output::print_json(&description)?;
            } else {
                output::print_description_table(&description);
            }
        }

        Commands::Import { secret_id, version_id, from } => {
            let raw = crate::secrets::SecretString::new(read_input(&from)?);
            let record = CredentialRecord::parse(&secret_id, &raw).map_err(RotationError::from)?;
            let backend = PostgresSecretBackend::new(pool);
            backend
                .put(
                    &secret_id,
                    &version_id,
                    &record.to_secret_string().map_err(RotationError::from)?,
                    &[StageLabel::Current],
                )
                .await
                .map_err(RotationError::from)?;
            println!("Imported {} as CURRENT version '{}'", secret_id, version_id);
        }

        Commands::Database { command } => handle_database_command(command, &pool).await?,
    }

    Ok(())
}

fn coordinator(
    pool: DbPool,
    config: &RotatorConfig,
) -> RotationCoordinator<CredentialStoreClient, PgConnector> {
    let store = CredentialStoreClient::new(Arc::new(PostgresSecretBackend::new(pool)));
    RotationCoordinator::new(
        store,
        PgConnector::new(),
        config.password.clone(),
        config.database.clone(),
    )
}

/// Handle secret store schema commands
async fn handle_database_command(command: DatabaseCommands, pool: &DbPool) -> anyhow::Result<()> {
    match command {
        DatabaseCommands::Migrate => {
            println!("Running secret store migrations...");
            run_migrations(pool).await?;
            println!("Migrations completed successfully!");
        }

        DatabaseCommands::Status => {
            let pending = pending_migration_count(pool).await?;
            if pending == 0 {
                println!("Secret store schema is up to date");
            } else {
                println!("Secret store schema has {} pending migration(s)", pending);
            }
        }

        DatabaseCommands::List => {
            let migrations = list_applied_migrations(pool).await?;
            if migrations.is_empty() {
                println!("No migrations have been applied");
            } else {
                println!("Applied migrations:");
                output::print_migrations_table(&migrations);
            }
        }
    }

    Ok(())
}

/// Reads a file, or stdin when `path` is `-`.
fn read_input(path: &std::path::Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer).context("Failed to read stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// Process exit status for an error returned by [`run_cli`].
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let retryable = err.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<RotationError>() {
            e.is_retryable()
        } else if let Some(e) = cause.downcast_ref::<crate::Error>() {
            e.is_retryable()
        } else {
            false
        }
    });

    if retryable {
        EXIT_RETRYABLE
    } else {
        EXIT_FATAL
    }
}

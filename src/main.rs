use std::process::ExitCode;

use secret_rotator::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if it exists (optional - won't fail if missing)
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    match cli::run_cli().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "secret-rotator failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(cli::exit_code(&e))
        }
    }
}

//! CLI smoke and maintenance entry point.
//!
//! # Responsibility
//! - Verify `trialhub_core` linkage with deterministic output.
//! - With `--db <path>`, open (and migrate) a database and report its
//!   schema version.
//! - With `--config <path>`, validate a platform config and install the
//!   configured file logger.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use trialhub_core::db::migrations::{current_user_version, latest_version};
use trialhub_core::{core_version, init_logging, open_db, ping, PlatformConfig};

/// Smoke check and database maintenance for trialhub.
#[derive(Parser, Debug, Default)]
#[command(name = "trialhub_cli", version)]
struct Cli {
    /// Open (and migrate) the SQLite database at this path.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Validate this platform config and install its file logger.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn run(args: Cli) -> Result<(), String> {
    println!("trialhub_core ping={}", ping());
    println!("trialhub_core version={}", core_version());

    if let Some(config_path) = args.config {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|err| format!("failed to read {}: {err}", config_path.display()))?;
        let config = PlatformConfig::from_json_str(&raw).map_err(|err| err.to_string())?;
        if config.logging.log_dir.is_some() {
            init_logging(&config.logging).map_err(|err| err.to_string())?;
        }
        println!("config=ok");
    }

    if let Some(db_path) = args.db {
        let conn = open_db(&db_path).map_err(|err| err.to_string())?;
        let version = current_user_version(&conn).map_err(|err| err.to_string())?;
        log::info!("event=cli_db_check module=cli status=ok schema_version={version}");
        println!("schema_version={version} latest={}", latest_version());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

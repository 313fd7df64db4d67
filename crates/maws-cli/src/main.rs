//! maws - MFA session credentials for the AWS CLI.
//!
//! Runs `aws` with cached temporary credentials, prompting for a one-time
//! code only when the cached session is missing or expired.
//!
//! Usage:
//!   maws <aws arguments..>        run aws with session credentials
//!   maws export-envs              print shell export statements
//!   maws delete-session-token     forget the cached session

use std::ffi::OsString;
use std::io;

use anyhow::Result;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use maws_core::auth::StdinPrompt;
use maws_core::delegate::export_statements;
use maws_core::{AwsCli, Config, CredentialCache, CredentialSource, Delegator};

// ============================================================================
// Constants
// ============================================================================

const DELETE_COMMAND: &str = "delete-session-token";
const EXPORT_COMMAND: &str = "export-envs";

/// Exit status for any maws failure
const FAILURE_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reserved {
    DeleteSession,
    ExportEnvs,
}

/// Reserved subcommands only apply when they are the sole argument.
fn reserved_command(args: &[OsString]) -> Option<Reserved> {
    match args {
        [only] if only == DELETE_COMMAND => Some(Reserved::DeleteSession),
        [only] if only == EXPORT_COMMAND => Some(Reserved::ExportEnvs),
        _ => None,
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
    // Logs go to stderr so stdout belongs to aws and export-envs.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("maws: {}", e);
            FAILURE_EXIT_CODE
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let config = Config::from_env()?;
    debug!(profile = %config.profile, data_dir = %config.data_dir.display(), "Loaded configuration");

    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    let cache = CredentialCache::new(config.session_path());
    let reserved = reserved_command(&args);

    if reserved == Some(Reserved::DeleteSession) {
        cache.delete()?;
        return Ok(0);
    }

    let credential =
        CredentialSource::new(&cache, AwsCli::from_config(&config), StdinPrompt::stdin()).obtain()?;

    if reserved == Some(Reserved::ExportEnvs) {
        println!("{}", export_statements(&credential));
        return Ok(0);
    }

    Ok(Delegator::from_config(&config).delegate(&credential, &args)?)
}

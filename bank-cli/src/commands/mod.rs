//! CLI command implementations

pub mod account;
pub mod doctor;
pub mod logs;
pub mod money;
pub mod user;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use bank_core::domain::result::Result as CoreResult;
use bank_core::services::{EntryPoint, LoggingService};
use bank_core::{BankContext, Error, ErrorKind, OperationResult};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let bank_dir = get_bank_dir().ok()?;
    std::fs::create_dir_all(&bank_dir).ok()?;
    LoggingService::new(&bank_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Write to the event log, ignoring any errors (logging should never break the app)
fn record(logger: &Option<LoggingService>, write: impl FnOnce(&LoggingService) -> Result<()>) {
    if let Some(l) = logger {
        if let Err(e) = write(l) {
            tracing::debug!(error = %e, "event log write failed");
        }
    }
}

/// Log a successful command execution
pub fn log_command(logger: &Option<LoggingService>, command: &str) {
    record(logger, |l| l.log_command(command));
}

/// Which part of the system produced an internal error
fn internal_source(err: &Error) -> Option<&'static str> {
    match err {
        Error::Database(_) => Some("database"),
        Error::Config(_) => Some("config"),
        Error::Io(_) => Some("io"),
        Error::Json(_) => Some("json"),
        Error::InvalidArgument(_) | Error::NotFound(_) | Error::Conflict(_) => None,
    }
}

/// Get the bank directory from BANK_DIR or ~/.bank
pub fn get_bank_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bank"))
        .ok_or_else(|| anyhow!("Could not find home directory; set BANK_DIR"))
}

/// Open the bank in the data directory, creating it on first use
pub fn get_context() -> Result<BankContext> {
    let bank_dir = get_bank_dir()?;

    std::fs::create_dir_all(&bank_dir)
        .with_context(|| format!("Failed to create bank directory: {:?}", bank_dir))?;

    BankContext::new(&bank_dir).context("Failed to initialize bank context")
}

/// Record the outcome of `command`, then print it
///
/// With `json` the outcome is written to stdout as an `OperationResult`,
/// failures included; otherwise `render` prints the success case. A failure
/// is still returned so the process exits with the matching status.
pub fn finish<T: Serialize>(
    command: &str,
    json: bool,
    result: CoreResult<T>,
    render: impl FnOnce(&T),
) -> Result<()> {
    let logger = get_logger();
    match &result {
        Ok(_) => log_command(&logger, command),
        Err(e) => {
            // Internal messages can echo stored values; keep them out of the log
            let message = match e.kind() {
                ErrorKind::Internal => "internal error".to_string(),
                _ => e.to_string(),
            };
            record(&logger, |l| l.log_error(command, e.kind(), &message, internal_source(e)));
        }
    }

    match result {
        Ok(data) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&OperationResult::ok(&data))?);
            } else {
                render(&data);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&OperationResult::<T>::fail(&e))?);
            }
            Err(e.into())
        }
    }
}

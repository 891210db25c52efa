//! Portalock: run commands under cross-process file locks.
//!
//! This is the main entry point for the `portalock` CLI. It parses arguments,
//! installs the log subscriber, dispatches to the appropriate command handler,
//! and handles errors with proper exit codes.

mod cli;
mod commands;

use cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `portalock=debug`).
const LOG_ENV: &str = "PORTALOCK_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match commands::dispatch(cli.command) {
        Ok(code) => ExitCode::from(clamp_exit_code(code)),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(clamp_exit_code(err.exit_code()))
        }
    }
}

/// Log to stderr so stdout stays with the wrapped command.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A second init only happens in tests; ignore it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn clamp_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(portalock::exit_codes::USER_ERROR as u8)
}

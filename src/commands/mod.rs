//! Command implementations for portalock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the helpers they share: config resolution, command
//! line splitting, and running the wrapped child process.

mod lock;
mod semaphore;
mod status;
mod write;

use crate::cli::{Command, RunArgs, TimingArgs};
use portalock::error::{LockError, Result};
use portalock::exit_codes;
use portalock::LockConfig;
use std::process::Command as ProcessCommand;
use std::time::Duration;

/// Dispatch a command to its implementation.
///
/// Returns the process exit code: the wrapped command's own status for
/// `lock` and `semaphore`, a status code for the others.
pub fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Lock(args) => lock::cmd_lock(args),
        Command::Semaphore(args) => semaphore::cmd_semaphore(args),
        Command::Write(args) => write::cmd_write(args),
        Command::Status(args) => status::cmd_status(args),
    }
}

/// Load `--config` if given, otherwise start from defaults.
fn load_config(timing: &TimingArgs) -> Result<LockConfig> {
    match &timing.config {
        Some(path) => LockConfig::load(path),
        None => Ok(LockConfig::default()),
    }
}

/// Convert a `--timeout`/`--interval` value into a duration.
fn parse_seconds(flag: &str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        LockError::Usage(format!(
            "--{} must be a non-negative number of seconds (got {})",
            flag, seconds
        ))
    })
}

/// Resolve the timing overrides given on the command line.
fn timing_overrides(timing: &TimingArgs) -> Result<(Option<Duration>, Option<Duration>)> {
    let timeout = timing
        .timeout
        .map(|secs| parse_seconds("timeout", secs))
        .transpose()?;
    let interval = timing
        .interval
        .map(|secs| parse_seconds("interval", secs))
        .transpose()?;

    if interval.is_some_and(|i| i.is_zero()) {
        return Err(LockError::Usage(
            "--interval must be greater than 0".to_string(),
        ));
    }
    Ok((timeout, interval))
}

/// Turn `-c "<command>"` or the trailing arguments into an argv vector.
///
/// Uses shell-words so quoting works as in a shell, without invoking one.
fn resolve_argv(run: &RunArgs) -> Result<Vec<String>> {
    let argv = match &run.command {
        Some(command) => shell_words::split(command).map_err(|e| {
            LockError::Usage(format!(
                "failed to parse command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                command, e
            ))
        })?,
        None => run.argv.clone(),
    };

    if argv.is_empty() {
        return Err(LockError::Usage(
            "no command given.\n\n\
             Fix: pass a command with -c \"...\" or after `--`."
                .to_string(),
        ));
    }
    Ok(argv)
}

/// Run the child process to completion and return its exit code.
///
/// The child inherits stdin, stdout and stderr.
fn run_child(argv: &[String]) -> Result<i32> {
    let program = &argv[0];
    let args = &argv[1..];

    tracing::debug!(program = %program, "running command");
    let status = ProcessCommand::new(program).args(args).status().map_err(|e| {
        LockError::io(
            format!(
                "failed to execute '{}'\n\nFix: ensure the command is installed and in PATH",
                program
            ),
            e,
        )
    })?;

    Ok(exit_code_of(status))
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    // Killed by a signal: report it the way shells do.
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    exit_codes::USER_ERROR
}

//! CLI argument parsing for portalock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Portalock: run commands under cross-process file locks.
///
/// Locks are advisory: they only exclude other processes that take the
/// same lock. Exit status is the wrapped command's own, or:
/// 1 for usage and I/O errors, 2 when the lock is taken, 3 on timeout.
#[derive(Parser, Debug)]
#[command(name = "portalock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log lock activity to stderr (overrides PORTALOCK_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for portalock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command while holding a lock file.
    ///
    /// Waits for the lock up to the timeout, runs the command, then
    /// releases the lock.
    Lock(LockArgs),

    /// Run a command while holding one slot of a bounded semaphore.
    ///
    /// At most `--max` commands sharing the same name and directory run
    /// at once.
    Semaphore(SemaphoreArgs),

    /// Replace a file with stdin atomically.
    ///
    /// Readers see either the old or the new content, never a mix.
    Write(WriteArgs),

    /// Report whether a lock file is currently held.
    ///
    /// Prints holder metadata when the holder recorded any.
    Status(StatusArgs),
}

/// Settings shared by `lock` and `semaphore`.
#[derive(Args, Debug, Default)]
pub struct TimingArgs {
    /// Seconds to wait for the lock before giving up.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Seconds between lock attempts while waiting.
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<f64>,

    /// YAML file with lock defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// The command to run under the lock.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Command line to run, split like a shell would (no shell is invoked).
    #[arg(short = 'c', long = "command", value_name = "COMMAND", conflicts_with = "argv")]
    pub command: Option<String>,

    /// Program and arguments to run (after `--`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub argv: Vec<String>,
}

/// Arguments for the `lock` command.
#[derive(Parser, Debug)]
pub struct LockArgs {
    /// Lock file to hold. Created if missing, never deleted.
    pub file: PathBuf,

    /// Take a shared lock instead of an exclusive one.
    #[arg(long)]
    pub shared: bool,

    /// Block in the OS call instead of polling (ignores --timeout).
    #[arg(long)]
    pub blocking: bool,

    /// Empty the lock file once it is held.
    #[arg(long)]
    pub truncate: bool,

    /// Exit immediately if the lock is taken.
    #[arg(long)]
    pub fail_when_locked: bool,

    /// Record holder metadata in the lock file, with this action label.
    #[arg(long, value_name = "ACTION")]
    pub record: Option<String>,

    #[command(flatten)]
    pub timing: TimingArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the `semaphore` command.
#[derive(Parser, Debug)]
pub struct SemaphoreArgs {
    /// Semaphore name shared by all participants.
    pub name: String,

    /// Maximum number of concurrent holders.
    #[arg(long, short = 'n')]
    pub max: usize,

    /// Directory holding the slot files (default: temp dir).
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Slot filename pattern with `{name}` and `{number}` placeholders.
    #[arg(long)]
    pub pattern: Option<String>,

    /// Try slots in random order.
    #[arg(long)]
    pub random: bool,

    /// Report a timeout instead of "already locked" when all slots stay
    /// taken.
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub timing: TimingArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the `write` command.
#[derive(Parser, Debug)]
pub struct WriteArgs {
    /// File to replace.
    pub target: PathBuf,
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Lock file to probe.
    pub file: PathBuf,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_lock_minimal() {
        let cli = Cli::try_parse_from(["portalock", "lock", "/tmp/a.lock", "--", "true"]).unwrap();
        if let Command::Lock(args) = cli.command {
            assert_eq!(args.file, PathBuf::from("/tmp/a.lock"));
            assert!(!args.shared);
            assert!(!args.blocking);
            assert!(args.timing.timeout.is_none());
            assert!(args.run.command.is_none());
            assert_eq!(args.run.argv, vec!["true"]);
        } else {
            panic!("Expected Lock command");
        }
    }

    #[test]
    fn parse_lock_full() {
        let cli = Cli::try_parse_from([
            "portalock",
            "-v",
            "lock",
            "/tmp/a.lock",
            "--shared",
            "--truncate",
            "--timeout",
            "1.5",
            "--interval",
            "0.1",
            "--fail-when-locked",
            "--record",
            "deploy",
            "-c",
            "echo 'hello world'",
        ])
        .unwrap();
        assert!(cli.verbose);
        if let Command::Lock(args) = cli.command {
            assert!(args.shared);
            assert!(args.truncate);
            assert!(args.fail_when_locked);
            assert_eq!(args.timing.timeout, Some(1.5));
            assert_eq!(args.timing.interval, Some(0.1));
            assert_eq!(args.record.as_deref(), Some("deploy"));
            assert_eq!(args.run.command.as_deref(), Some("echo 'hello world'"));
        } else {
            panic!("Expected Lock command");
        }
    }

    #[test]
    fn parse_lock_trailing_args_keep_hyphens() {
        let cli =
            Cli::try_parse_from(["portalock", "lock", "a.lock", "--", "ls", "-la", "--color"])
                .unwrap();
        if let Command::Lock(args) = cli.command {
            assert_eq!(args.run.argv, vec!["ls", "-la", "--color"]);
        } else {
            panic!("Expected Lock command");
        }
    }

    #[test]
    fn parse_lock_rejects_both_command_forms() {
        let result = Cli::try_parse_from(["portalock", "lock", "a.lock", "-c", "true", "--", "ls"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_semaphore() {
        let cli = Cli::try_parse_from([
            "portalock",
            "semaphore",
            "builds",
            "--max",
            "3",
            "--dir",
            "/tmp/sem",
            "--random",
            "--wait",
            "--",
            "make",
        ])
        .unwrap();
        if let Command::Semaphore(args) = cli.command {
            assert_eq!(args.name, "builds");
            assert_eq!(args.max, 3);
            assert_eq!(args.dir, Some(PathBuf::from("/tmp/sem")));
            assert!(args.random);
            assert!(args.wait);
            assert!(args.pattern.is_none());
            assert_eq!(args.run.argv, vec!["make"]);
        } else {
            panic!("Expected Semaphore command");
        }
    }

    #[test]
    fn parse_semaphore_requires_max() {
        assert!(Cli::try_parse_from(["portalock", "semaphore", "builds", "--", "make"]).is_err());
    }

    #[test]
    fn parse_write_and_status() {
        let cli = Cli::try_parse_from(["portalock", "write", "out.txt"]).unwrap();
        assert!(matches!(cli.command, Command::Write(_)));

        let cli = Cli::try_parse_from(["portalock", "status", "a.lock"]).unwrap();
        assert!(matches!(cli.command, Command::Status(_)));
    }
}

//! Implementation of the `portalock lock` command.

use super::{load_config, resolve_argv, run_child, timing_overrides};
use crate::cli::LockArgs;
use portalock::error::{LockError, Result};
use portalock::{Lock, LockConfig, LockMetadata, OpenMode};

/// Execute the `portalock lock` command.
///
/// Acquires the lock, optionally records holder metadata, runs the command
/// and releases the lock. Returns the command's exit code.
pub fn cmd_lock(args: LockArgs) -> Result<i32> {
    let argv = resolve_argv(&args.run)?;
    let config = merge_config(load_config(&args.timing)?, &args)?;
    let (timeout, interval) = timing_overrides(&args.timing)?;

    let mut lock = Lock::from_config(&args.file, &config);
    if let Some(timeout) = timeout {
        lock = lock.with_timeout(timeout);
    }
    if let Some(interval) = interval {
        lock = lock.with_check_interval(interval);
    }

    let mut guard = lock.lock()?;
    tracing::info!(path = %guard.path().display(), "lock acquired");

    if let Some(action) = &args.record {
        LockMetadata::new(action).write_to(&mut guard)?;
    }

    let code = run_child(&argv)?;
    guard.release()?;
    Ok(code)
}

/// Apply command-line flags on top of the loaded config.
fn merge_config(mut config: LockConfig, args: &LockArgs) -> Result<LockConfig> {
    config.shared |= args.shared;
    config.blocking |= args.blocking;
    config.fail_when_locked |= args.fail_when_locked;

    if args.record.is_some() {
        if config.shared {
            return Err(LockError::Usage(
                "--record needs an exclusive lock; other readers share the file".to_string(),
            ));
        }
        config.mode = OpenMode::Write;
    }
    if args.truncate {
        config.mode = OpenMode::Write;
    }
    Ok(config)
}

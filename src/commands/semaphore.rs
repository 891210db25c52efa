//! Implementation of the `portalock semaphore` command.

use super::{load_config, resolve_argv, run_child, timing_overrides};
use crate::cli::SemaphoreArgs;
use portalock::error::Result;
use portalock::{BoundedSemaphore, LockConfig};

/// Execute the `portalock semaphore` command.
///
/// Takes one free slot of the named semaphore, runs the command while
/// holding it, then frees the slot.
pub fn cmd_semaphore(args: SemaphoreArgs) -> Result<i32> {
    let argv = resolve_argv(&args.run)?;
    let config = merge_config(load_config(&args.timing)?, &args)?;
    let (timeout, interval) = timing_overrides(&args.timing)?;

    let mut semaphore = BoundedSemaphore::new(args.max, args.name.as_str()).with_config(&config);
    if let Some(timeout) = timeout {
        semaphore = semaphore.with_timeout(timeout);
    }
    if let Some(interval) = interval {
        semaphore = semaphore.with_check_interval(interval);
    }

    let guard = semaphore.guard()?;
    if let Some(path) = guard.path() {
        tracing::info!(path = %path.display(), "semaphore slot acquired");
    }

    let code = run_child(&argv)?;
    guard.release()?;
    Ok(code)
}

/// Apply command-line flags on top of the loaded config.
fn merge_config(mut config: LockConfig, args: &SemaphoreArgs) -> Result<LockConfig> {
    if let Some(dir) = &args.dir {
        config.semaphore.directory = Some(dir.clone());
    }
    if let Some(pattern) = &args.pattern {
        config.semaphore.pattern = pattern.clone();
    }
    config.semaphore.randomized |= args.random;
    if args.wait {
        config.semaphore.fail_when_locked = false;
    }

    config.validate()?;
    Ok(config)
}

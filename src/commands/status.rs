//! Implementation of the `portalock status` command.
//!
//! Probes a lock file with a fail-fast exclusive attempt. The probe holds
//! the lock for an instant only and never creates a missing file.

use crate::cli::StatusArgs;
use portalock::error::{LockError, Result};
use portalock::exit_codes;
use portalock::{Lock, LockMetadata};
use std::path::Path;

/// What the probe found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockState {
    Missing,
    Unlocked,
    Locked,
}

/// Execute the `portalock status` command.
///
/// Prints `locked` or `unlocked`, followed by holder metadata when the lock
/// file has some. Exits with `ALREADY_LOCKED` when the lock is held so
/// scripts can test for it.
pub fn cmd_status(args: StatusArgs) -> Result<i32> {
    let state = probe(&args.file)?;

    match state {
        LockState::Missing => {
            println!("unlocked (no lock file at {})", args.file.display());
            return Ok(exit_codes::SUCCESS);
        }
        LockState::Unlocked => println!("unlocked"),
        LockState::Locked => println!("locked"),
    }

    // Windows locks are mandatory, so a held file may refuse the read.
    if let Ok(Some(metadata)) = LockMetadata::from_file(&args.file) {
        let label = match state {
            LockState::Locked => "holder",
            _ => "last holder",
        };
        println!("  {}: {}", label, metadata);
    }

    Ok(match state {
        LockState::Locked => exit_codes::ALREADY_LOCKED,
        _ => exit_codes::SUCCESS,
    })
}

fn probe(path: &Path) -> Result<LockState> {
    if !path.exists() {
        return Ok(LockState::Missing);
    }

    let mut lock = Lock::new(path).with_fail_when_locked(true);
    match lock.acquire() {
        Ok(_) => {
            lock.release()?;
            Ok(LockState::Unlocked)
        }
        Err(LockError::AlreadyLocked(_)) => Ok(LockState::Locked),
        Err(e) => Err(e),
    }
}

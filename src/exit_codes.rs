//! Exit code constants for the portalock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config, I/O failure)
//! - 2: Lock already held elsewhere (fail-fast or semaphore exhausted)
//! - 3: Timed out waiting for the lock
//!
//! When a wrapped command runs, its own exit status is returned instead.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or an OS failure.
pub const USER_ERROR: i32 = 1;

/// The lock (or every semaphore slot) is held by someone else.
pub const ALREADY_LOCKED: i32 = 2;

/// Waiting for the lock exceeded the configured timeout.
pub const TIMEOUT: i32 = 3;

//! Error types for portalock.
//!
//! Uses thiserror for derive macros. Contention is reported through
//! [`LockError::AlreadyLocked`] and [`LockError::Timeout`]; every other OS
//! failure surfaces as [`LockError::Io`] and is never retried.

use crate::exit_codes;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for portalock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// The resource is locked by another holder and the caller asked to fail
    /// fast, or every semaphore slot is taken.
    #[error("already locked: {0}")]
    AlreadyLocked(String),

    /// The poll loop ran out of time. `source` is the contention error seen
    /// on the first attempt.
    #[error("timed out after {timeout:?} waiting for lock on '{}'", path.display())]
    Timeout {
        path: PathBuf,
        timeout: Duration,
        #[source]
        source: io::Error,
    },

    /// An open, lock, unlock, write or rename call failed for a reason other
    /// than contention.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The lock instance already holds its file handle.
    #[error("lock is already held by this instance: {0}")]
    AlreadyHeld(String),

    /// Released more times than acquired.
    #[error("lock is not held: {0}")]
    NotHeld(String),

    /// Configuration could not be parsed or failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bad command-line input (empty command, unparsable durations).
    #[error("{0}")]
    Usage(String),
}

impl LockError {
    /// Wrap an I/O error with a short description of what was attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        LockError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this error came from contention rather than a hard failure.
    pub fn is_contention(&self) -> bool {
        matches!(self, LockError::AlreadyLocked(_) | LockError::Timeout { .. })
    }

    /// Returns the process exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockError::AlreadyLocked(_) => exit_codes::ALREADY_LOCKED,
            LockError::Timeout { .. } => exit_codes::TIMEOUT,
            LockError::Io { .. }
            | LockError::AlreadyHeld(_)
            | LockError::NotHeld(_)
            | LockError::InvalidConfig(_)
            | LockError::Usage(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for portalock operations.
pub type Result<T> = std::result::Result<T, LockError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn already_locked_has_correct_exit_code() {
        let err = LockError::AlreadyLocked("/tmp/x.lock".to_string());
        assert_eq!(err.exit_code(), exit_codes::ALREADY_LOCKED);
        assert!(err.is_contention());
    }

    #[test]
    fn timeout_has_correct_exit_code_and_source() {
        let err = LockError::Timeout {
            path: PathBuf::from("/tmp/x.lock"),
            timeout: Duration::from_secs(1),
            source: io::Error::from(io::ErrorKind::WouldBlock),
        };
        assert_eq!(err.exit_code(), exit_codes::TIMEOUT);
        assert!(err.is_contention());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/tmp/x.lock"));
    }

    #[test]
    fn io_error_is_not_contention() {
        let err = LockError::io(
            "failed to open '/nope'",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(!err.is_contention());
        assert!(err.to_string().starts_with("failed to open '/nope'"));
    }

    #[test]
    fn misuse_errors_are_user_errors() {
        assert_eq!(
            LockError::NotHeld("x".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            LockError::AlreadyHeld("x".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            LockError::InvalidConfig("x".to_string()).to_string(),
            "invalid configuration: x"
        );
    }
}

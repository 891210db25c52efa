//! Lock configuration types and defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long `acquire` keeps polling before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between lock attempts while polling.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Plain locks wait for contended files by default.
pub const DEFAULT_FAIL_WHEN_LOCKED: bool = false;

/// How the lock file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Open for reading and appending, creating the file if missing.
    #[default]
    Append,
    /// Like `Append`, but the file is truncated to zero length once the lock
    /// is confirmed. Never truncated before that.
    Write,
}

impl OpenMode {
    /// Parse an open mode from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "append" | "a" => Some(Self::Append),
            "write" | "w" => Some(Self::Write),
            _ => None,
        }
    }

    /// Whether the file is emptied after locking.
    pub fn truncates(self) -> bool {
        matches!(self, Self::Write)
    }
}

/// Order in which a semaphore tries its slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotSelection {
    /// Slot 0 first, then 1, and so on.
    #[default]
    Sequential,
    /// A fresh shuffle on every attempt, so contenders don't pile onto the
    /// low-numbered slots.
    Randomized,
}

/// Per-call overrides for `acquire`.
///
/// Unset fields fall back to the values the lock was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcquireOptions {
    pub timeout: Option<Duration>,
    pub check_interval: Option<Duration>,
    pub fail_when_locked: Option<bool>,
}

impl AcquireOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = Some(check_interval);
        self
    }

    #[must_use]
    pub fn with_fail_when_locked(mut self, fail_when_locked: bool) -> Self {
        self.fail_when_locked = Some(fail_when_locked);
        self
    }
}

//! Config struct definition and default implementation.

use crate::locks::{DEFAULT_FILENAME_PATTERN, OpenMode, SlotSelection};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default lock settings.
///
/// This struct represents the contents of a `portalock.yaml` file.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    // =========================================================================
    // Acquisition settings
    // =========================================================================
    /// Seconds to keep polling a contended lock (default: 5).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Seconds between lock attempts (default: 0.25).
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: f64,

    /// Fail immediately instead of polling when the lock is taken.
    #[serde(default)]
    pub fail_when_locked: bool,

    // =========================================================================
    // Lock mode
    // =========================================================================
    /// Take a shared lock instead of an exclusive one.
    #[serde(default)]
    pub shared: bool,

    /// Let the OS call block instead of polling. The timeout is ignored.
    #[serde(default)]
    pub blocking: bool,

    /// `append` keeps the lock file's content, `write` empties it once locked.
    #[serde(default)]
    pub mode: OpenMode,

    // =========================================================================
    // Semaphore settings
    // =========================================================================
    #[serde(default)]
    pub semaphore: SemaphoreConfig,
}

/// Settings for bounded semaphores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemaphoreConfig {
    /// Where slot files live (default: the platform temp directory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Slot filename template; must contain `{number}`.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Report exhaustion as "already locked" rather than a timeout.
    #[serde(default = "default_true")]
    pub fail_when_locked: bool,

    /// Shuffle slots on every attempt.
    #[serde(default)]
    pub randomized: bool,
}

impl SemaphoreConfig {
    pub fn selection(&self) -> SlotSelection {
        if self.randomized {
            SlotSelection::Randomized
        } else {
            SlotSelection::Sequential
        }
    }
}

fn default_timeout_secs() -> f64 {
    5.0
}

fn default_check_interval_secs() -> f64 {
    0.25
}

fn default_pattern() -> String {
    DEFAULT_FILENAME_PATTERN.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            check_interval_secs: default_check_interval_secs(),
            fail_when_locked: false,
            shared: false,
            blocking: false,
            mode: OpenMode::default(),
            semaphore: SemaphoreConfig::default(),
        }
    }
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            directory: None,
            pattern: default_pattern(),
            fail_when_locked: default_true(),
            randomized: false,
        }
    }
}

//! Lock holder metadata.
//!
//! The content of a lock file is irrelevant to locking. A holder that opened
//! its lock in write mode may still record who it is, which makes contended
//! locks easier to diagnose.

use crate::error::{LockError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Holder information written into a lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Owner of the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lock holder (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Timestamp when the lock was taken (RFC3339).
    pub created_at: DateTime<Utc>,

    /// What the holder is doing.
    pub action: String,
}

impl LockMetadata {
    /// Create new lock metadata with the current timestamp.
    pub fn new(action: &str) -> Self {
        Self {
            owner: get_owner_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
            action: action.to_string(),
        }
    }

    /// Read metadata from a lock file.
    ///
    /// Returns `Ok(None)` when the file is empty or does not hold metadata,
    /// since lock files are not required to.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LockError::io(format!("failed to read lock file '{}'", path.display()), e)
        })?;

        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&content).ok())
    }

    /// Serialize lock metadata to JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            LockError::InvalidConfig(format!("failed to serialize lock metadata: {}", e))
        })
    }

    /// Write the metadata into a held lock file and flush it to disk.
    ///
    /// The lock should have been opened in write mode so the file starts
    /// out empty.
    pub fn write_to(&self, file: &mut File) -> Result<()> {
        let json = self.to_json()?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| LockError::io("failed to write lock metadata", e))
    }

    /// Calculate the age of the lock.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m", minutes)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl std::fmt::Display for LockMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "owner: {}, pid: {}, age: {}, action: {}",
            self.owner,
            self.pid
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.age_string(),
            self.action
        )
    }
}

/// Get the owner string for lock metadata.
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

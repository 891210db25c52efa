//! Temporary file lock.
//!
//! A lock file that only exists while it is held: opened in write mode,
//! failing fast by default, and removed again on release or drop.
//!
//! Deleting the file opens a window where a contender still holds a handle
//! to the unlinked file while another creates a fresh one at the same path.
//! The file is unlinked before it is unlocked, and every acquisition checks
//! that its handle is still the file at the path, retrying otherwise.

use super::lock::Lock;
use super::types::{AcquireOptions, OpenMode};
use crate::error::{LockError, Result};
use crate::flags::LockFlags;
use crate::platform::Locker;
use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default lock file name, relative to the working directory.
pub const DEFAULT_TEMPORARY_LOCK: &str = ".lock";

/// A [`Lock`] whose file is deleted when released.
#[derive(Debug)]
pub struct TemporaryFileLock {
    lock: Lock,
}

impl Default for TemporaryFileLock {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPORARY_LOCK)
    }
}

impl TemporaryFileLock {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            lock: Lock::new(path)
                .with_mode(OpenMode::Write)
                .with_fail_when_locked(true),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.lock.set_timeout(timeout);
        self
    }

    #[must_use]
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.lock.set_check_interval(check_interval);
        self
    }

    #[must_use]
    pub fn with_fail_when_locked(mut self, fail_when_locked: bool) -> Self {
        self.lock.set_fail_when_locked(fail_when_locked);
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: LockFlags) -> Self {
        self.lock.set_flags(flags);
        self
    }

    /// Use a different lock primitive (mostly useful in tests).
    #[must_use]
    pub fn with_locker(mut self, locker: Arc<dyn Locker>) -> Self {
        self.lock.set_locker(locker);
        self
    }

    pub fn path(&self) -> &Path {
        self.lock.path()
    }

    pub fn is_held(&self) -> bool {
        self.lock.is_held()
    }

    pub fn acquire(&mut self) -> Result<&mut File> {
        self.acquire_with(AcquireOptions::default())
    }

    /// Acquire the lock, retrying when the locked handle turns out to be a
    /// file that its previous holder already unlinked.
    pub fn acquire_with(&mut self, options: AcquireOptions) -> Result<&mut File> {
        loop {
            self.lock.acquire_with(options)?;
            if self.holds_current_file()? {
                break;
            }
            tracing::debug!(
                path = %self.lock.path().display(),
                "locked a stale lock file, retrying"
            );
            self.lock.release()?;
        }

        self.lock.held_file_mut()
    }

    /// Release the lock and delete the lock file.
    ///
    /// The file is only removed if this instance held it, so a lock file
    /// belonging to someone else is never deleted.
    pub fn release(&mut self) -> Result<()> {
        if !self.lock.is_held() {
            return Ok(());
        }

        // Windows refuses to delete a file with open handles.
        #[cfg(unix)]
        let removed = self.remove_file();
        self.lock.release()?;
        #[cfg(not(unix))]
        let removed = self.remove_file();

        removed
    }

    fn remove_file(&self) -> Result<()> {
        match fs::remove_file(self.lock.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::io(
                format!("failed to remove '{}'", self.lock.path().display()),
                e,
            )),
        }
    }

    /// Whether the held handle is still the file found at the lock path.
    fn holds_current_file(&self) -> Result<bool> {
        let Some(file) = self.lock.file() else {
            return Ok(false);
        };
        let path = self.lock.path();

        let held = file
            .metadata()
            .map_err(|e| LockError::io(format!("failed to stat '{}'", path.display()), e))?;
        match fs::metadata(path) {
            Ok(current) => Ok(same_file(&held, &current)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LockError::io(
                format!("failed to stat '{}'", path.display()),
                e,
            )),
        }
    }
}

#[cfg(unix)]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

// Windows can't unlink a file that is still open, so a held handle always
// names the file at the path.
#[cfg(not(unix))]
fn same_file(_a: &Metadata, _b: &Metadata) -> bool {
    true
}

impl Drop for TemporaryFileLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(path = %self.lock.path().display(), error = %e, "failed to clean up temporary lock");
        }
    }
}

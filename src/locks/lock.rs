//! The lock acquisition engine.
//!
//! A [`Lock`] turns one non-blocking OS lock attempt into a bounded wait:
//! open the file, try the lock, and on contention either fail straight away
//! (`fail_when_locked`) or sleep `check_interval` and try again with a fresh
//! handle until `timeout` has passed.

use super::guard::LockGuard;
use super::types::{
    AcquireOptions, DEFAULT_CHECK_INTERVAL, DEFAULT_FAIL_WHEN_LOCKED, DEFAULT_TIMEOUT, OpenMode,
};
use crate::config::LockConfig;
use crate::error::{LockError, Result};
use crate::flags::LockFlags;
use crate::platform::{LockStatus, Locker, SystemLocker};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A file-backed lock with a built-in timeout.
///
/// Building a `Lock` does no I/O. [`Lock::acquire`] opens and locks the
/// file; [`Lock::release`] unlocks and closes it. The same instance can be
/// acquired and released any number of times, but holds at most one handle.
///
/// Prefer [`Lock::lock`], which returns a guard that releases on every exit
/// path. Dropping a still-held `Lock` releases it as a last resort.
#[derive(Debug)]
pub struct Lock {
    path: PathBuf,
    mode: OpenMode,
    timeout: Duration,
    explicit_timeout: bool,
    check_interval: Duration,
    fail_when_locked: bool,
    flags: LockFlags,
    locker: Arc<dyn Locker>,
    file: Option<File>,
}

enum Attempt {
    Locked(File),
    Contended(io::Error),
}

impl Lock {
    /// Create a lock for `path` with default settings.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            mode: OpenMode::default(),
            timeout: DEFAULT_TIMEOUT,
            explicit_timeout: false,
            check_interval: DEFAULT_CHECK_INTERVAL,
            fail_when_locked: DEFAULT_FAIL_WHEN_LOCKED,
            flags: LockFlags::default(),
            locker: Arc::new(SystemLocker),
            file: None,
        }
    }

    /// Create a lock for `path` using the settings in `config`.
    pub fn from_config<P: Into<PathBuf>>(path: P, config: &LockConfig) -> Self {
        // A config timeout is a default, so blocking configs don't warn about it.
        let mut lock = Self::new(path)
            .with_mode(config.mode)
            .with_flags(config.flags())
            .with_check_interval(config.check_interval())
            .with_fail_when_locked(config.fail_when_locked);
        lock.timeout = config.timeout();
        lock
    }

    #[must_use]
    pub fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.set_timeout(timeout);
        self
    }

    #[must_use]
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.set_check_interval(check_interval);
        self
    }

    #[must_use]
    pub fn with_fail_when_locked(mut self, fail_when_locked: bool) -> Self {
        self.set_fail_when_locked(fail_when_locked);
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: LockFlags) -> Self {
        self.set_flags(flags);
        self
    }

    /// Use a different lock primitive (mostly useful in tests).
    #[must_use]
    pub fn with_locker(mut self, locker: Arc<dyn Locker>) -> Self {
        self.set_locker(locker);
        self
    }

    // In-place setters for wrappers that implement `Drop` and so can't move
    // their `Lock` through the builders.

    pub(super) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
        self.explicit_timeout = true;
        self.warn_if_timeout_ignored(timeout);
    }

    pub(super) fn set_check_interval(&mut self, check_interval: Duration) {
        self.check_interval = check_interval;
    }

    pub(super) fn set_fail_when_locked(&mut self, fail_when_locked: bool) {
        self.fail_when_locked = fail_when_locked;
    }

    pub(super) fn set_flags(&mut self, flags: LockFlags) {
        self.flags = flags;
        if self.explicit_timeout {
            self.warn_if_timeout_ignored(self.timeout);
        }
    }

    pub(super) fn set_locker(&mut self, locker: Arc<dyn Locker>) {
        self.locker = locker;
    }

    pub(super) fn held_file_mut(&mut self) -> Result<&mut File> {
        match self.file {
            Some(ref mut file) => Ok(file),
            None => Err(LockError::NotHeld(self.path.display().to_string())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn fail_when_locked(&self) -> bool {
        self.fail_when_locked
    }

    pub fn flags(&self) -> LockFlags {
        self.flags
    }

    pub(crate) fn locker(&self) -> Arc<dyn Locker> {
        Arc::clone(&self.locker)
    }

    /// Whether this instance currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// The locked handle, if held.
    pub fn file(&self) -> Option<&File> {
        self.file.as_ref()
    }

    /// The locked handle, if held.
    pub fn file_mut(&mut self) -> Option<&mut File> {
        self.file.as_mut()
    }

    /// Acquire the lock with the configured settings.
    pub fn acquire(&mut self) -> Result<&mut File> {
        self.acquire_with(AcquireOptions::default())
    }

    /// Acquire the lock, overriding settings for this call only.
    ///
    /// # Errors
    ///
    /// * `AlreadyHeld` - this instance already holds the lock
    /// * `AlreadyLocked` - contended and `fail_when_locked` is set
    /// * `Timeout` - still contended after `timeout`
    /// * `Io` - opening, locking or truncating failed
    pub fn acquire_with(&mut self, options: AcquireOptions) -> Result<&mut File> {
        if self.file.is_some() {
            return Err(LockError::AlreadyHeld(self.path.display().to_string()));
        }

        let timeout = options.timeout.unwrap_or(self.timeout);
        let check_interval = options.check_interval.unwrap_or(self.check_interval);
        let fail_when_locked = options.fail_when_locked.unwrap_or(self.fail_when_locked);
        if options.timeout.is_some() {
            self.warn_if_timeout_ignored(timeout);
        }

        let started = Instant::now();
        let file = match self.attempt()? {
            Attempt::Locked(file) => file,
            Attempt::Contended(err) => {
                if fail_when_locked {
                    tracing::debug!(path = %self.path.display(), "lock contended, failing fast");
                    return Err(LockError::AlreadyLocked(self.path.display().to_string()));
                }
                self.poll(started, timeout, check_interval, err)?
            }
        };

        let file = self.prepare(file)?;
        tracing::debug!(
            path = %self.path.display(),
            waited_ms = started.elapsed().as_millis() as u64,
            "lock acquired"
        );
        Ok(self.file.insert(file))
    }

    /// Acquire the lock and return a guard that releases it when dropped.
    pub fn lock(&mut self) -> Result<LockGuard<'_>> {
        self.lock_with(AcquireOptions::default())
    }

    /// Like [`Lock::lock`], overriding settings for this call only.
    pub fn lock_with(&mut self, options: AcquireOptions) -> Result<LockGuard<'_>> {
        self.acquire_with(options)?;
        Ok(LockGuard::new(self))
    }

    /// Unlock and close the held handle.
    ///
    /// Does nothing when the lock is not held.
    pub fn release(&mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        let unlocked = self.locker.unlock(&file);
        drop(file);
        unlocked.map_err(|e| {
            LockError::io(format!("failed to unlock '{}'", self.path.display()), e)
        })?;

        tracing::debug!(path = %self.path.display(), "lock released");
        Ok(())
    }

    fn poll(
        &self,
        started: Instant,
        timeout: Duration,
        check_interval: Duration,
        first_error: io::Error,
    ) -> Result<File> {
        let mut attempts: u32 = 1;
        loop {
            thread::sleep(check_interval);
            attempts += 1;

            match self.attempt()? {
                Attempt::Locked(file) => return Ok(file),
                Attempt::Contended(_) if started.elapsed() > timeout => {
                    tracing::debug!(path = %self.path.display(), attempts, "lock timed out");
                    return Err(LockError::Timeout {
                        path: self.path.clone(),
                        timeout,
                        source: first_error,
                    });
                }
                Attempt::Contended(_) => {
                    tracing::trace!(path = %self.path.display(), attempts, "lock still contended");
                }
            }
        }
    }

    /// Open a fresh handle and try to lock it once.
    fn attempt(&self) -> Result<Attempt> {
        let file = self.open()?;
        match self.locker.try_lock(&file, self.flags) {
            Ok(LockStatus::Acquired) => Ok(Attempt::Locked(file)),
            Ok(LockStatus::Contended(err)) => Ok(Attempt::Contended(err)),
            Err(e) => Err(LockError::io(
                format!("failed to lock '{}'", self.path.display()),
                e,
            )),
        }
    }

    fn open(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| LockError::io(format!("failed to open '{}'", self.path.display()), e))
    }

    /// Truncate only once the lock is confirmed.
    fn prepare(&self, mut file: File) -> Result<File> {
        if !self.mode.truncates() {
            return Ok(file);
        }

        let truncated = file
            .set_len(0)
            .and_then(|()| file.seek(SeekFrom::Start(0)).map(|_| ()));
        if let Err(e) = truncated {
            if let Err(unlock_err) = self.locker.unlock(&file) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %unlock_err,
                    "failed to unlock after truncation error"
                );
            }
            return Err(LockError::io(
                format!("failed to truncate '{}'", self.path.display()),
                e,
            ));
        }
        Ok(file)
    }

    fn warn_if_timeout_ignored(&self, timeout: Duration) {
        if !timeout.is_zero() && !self.flags.is_non_blocking() {
            tracing::warn!(
                path = %self.path.display(),
                "timeout has no effect in blocking mode"
            );
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if self.file.is_some()
            && let Err(e) = self.release()
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock on drop");
        }
    }
}

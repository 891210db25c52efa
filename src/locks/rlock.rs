//! Reentrant lock.
//!
//! Works like [`Lock`], but the holder can acquire it again without blocking
//! on itself. The file lock is taken on the first acquisition and released
//! only when the matching number of releases has been made.

use super::lock::Lock;
use super::types::AcquireOptions;
use crate::error::{LockError, Result};
use std::fs::File;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

/// A counting wrapper around a [`Lock`].
///
/// Invariant: the underlying file lock is held iff `count() > 0`.
#[derive(Debug)]
pub struct ReentrantLock {
    lock: Lock,
    count: usize,
}

impl ReentrantLock {
    /// Create a reentrant lock for `path` with default settings.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self::from_lock(Lock::new(path))
    }

    /// Wrap an already configured lock. It must not be held.
    pub fn from_lock(lock: Lock) -> Self {
        let count = usize::from(lock.is_held());
        Self { lock, count }
    }

    pub fn path(&self) -> &Path {
        self.lock.path()
    }

    /// Number of outstanding acquisitions.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_held(&self) -> bool {
        self.count > 0
    }

    /// The locked handle, if held.
    pub fn file(&self) -> Option<&File> {
        self.lock.file()
    }

    pub fn acquire(&mut self) -> Result<&mut File> {
        self.acquire_with(AcquireOptions::default())
    }

    /// Take the file lock if this is the first acquisition, then count it.
    ///
    /// A failed first acquisition leaves the count at zero.
    pub fn acquire_with(&mut self, options: AcquireOptions) -> Result<&mut File> {
        if self.count == 0 {
            self.lock.acquire_with(options)?;
        }
        self.count += 1;
        tracing::trace!(path = %self.lock.path().display(), count = self.count, "reentrant acquire");

        let path = self.lock.path().display().to_string();
        self.lock.file_mut().ok_or(LockError::NotHeld(path))
    }

    /// Count one release, releasing the file lock on the last one.
    ///
    /// # Errors
    ///
    /// * `NotHeld` - more releases than acquisitions
    /// * `Io` - unlocking failed; the count is left unchanged
    pub fn release(&mut self) -> Result<()> {
        match self.count {
            0 => Err(LockError::NotHeld(format!(
                "cannot release more than acquired on '{}'",
                self.lock.path().display()
            ))),
            1 => {
                self.lock.release()?;
                self.count = 0;
                Ok(())
            }
            _ => {
                self.count -= 1;
                Ok(())
            }
        }
    }

    /// Acquire and return a guard that releases one level when dropped.
    ///
    /// The guard derefs to the `ReentrantLock`, so nested scopes can call
    /// `lock()` on it again.
    pub fn lock(&mut self) -> Result<ReentrantGuard<'_>> {
        self.acquire()?;
        Ok(ReentrantGuard { lock: self })
    }
}

/// Releases one level of a [`ReentrantLock`] when dropped.
#[derive(Debug)]
pub struct ReentrantGuard<'a> {
    lock: &'a mut ReentrantLock,
}

impl Deref for ReentrantGuard<'_> {
    type Target = ReentrantLock;

    fn deref(&self) -> &ReentrantLock {
        self.lock
    }
}

impl DerefMut for ReentrantGuard<'_> {
    fn deref_mut(&mut self) -> &mut ReentrantLock {
        self.lock
    }
}

impl Drop for ReentrantGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release() {
            tracing::warn!(path = %self.lock.path().display(), error = %e, "failed to release reentrant lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn contender(path: &Path) -> Lock {
        Lock::new(path).with_fail_when_locked(true)
    }

    #[test]
    fn nested_acquisitions_release_file_lock_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("r.lock");
        let mut rlock = ReentrantLock::new(&path);

        for _ in 0..3 {
            rlock.acquire().unwrap();
        }
        assert_eq!(rlock.count(), 3);

        rlock.release().unwrap();
        rlock.release().unwrap();
        assert_eq!(rlock.count(), 1);
        assert!(rlock.is_held());
        let err = contender(&path).acquire().unwrap_err();
        assert!(matches!(err, LockError::AlreadyLocked(_)));

        rlock.release().unwrap();
        assert_eq!(rlock.count(), 0);
        assert!(rlock.file().is_none());
        contender(&path).acquire().unwrap();
    }

    #[test]
    fn reacquire_does_not_block_on_itself() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("r.lock");
        let mut rlock = ReentrantLock::from_lock(
            Lock::new(&path).with_timeout(std::time::Duration::from_millis(50)),
        );

        rlock.acquire().unwrap();
        let started = std::time::Instant::now();
        rlock.acquire().unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(50));
        assert_eq!(rlock.count(), 2);
    }

    #[test]
    fn over_release_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut rlock = ReentrantLock::new(temp_dir.path().join("r.lock"));

        let err = rlock.release().unwrap_err();
        assert!(matches!(err, LockError::NotHeld(_)));

        rlock.acquire().unwrap();
        rlock.release().unwrap();
        assert!(rlock.release().is_err());
    }

    #[test]
    fn failed_first_acquire_leaves_count_at_zero() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("r.lock");
        let mut holder = Lock::new(&path);
        holder.acquire().unwrap();

        let mut rlock = ReentrantLock::from_lock(contender(&path));
        assert!(rlock.acquire().is_err());
        assert_eq!(rlock.count(), 0);
    }

    #[test]
    fn nested_guards_release_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("r.lock");
        let mut rlock = ReentrantLock::new(&path);

        {
            let mut outer = rlock.lock().unwrap();
            {
                let inner = outer.lock().unwrap();
                assert_eq!(inner.count(), 2);
            }
            assert_eq!(outer.count(), 1);
            assert!(contender(&path).acquire().is_err());
        }

        assert_eq!(rlock.count(), 0);
        contender(&path).acquire().unwrap();
    }
}

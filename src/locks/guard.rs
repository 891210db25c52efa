//! RAII lock guard implementation.

use super::lock::Lock;
use crate::error::Result;
use std::fs::File;
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// RAII guard for a held [`Lock`].
///
/// Derefs to the locked [`File`]. When dropped, the lock is released.
/// If releasing fails during drop, a warning is logged but no panic occurs.
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a mut Lock,

    /// Whether the lock has been released manually.
    released: bool,
}

impl<'a> LockGuard<'a> {
    pub(super) fn new(lock: &'a mut Lock) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        self.lock.path()
    }

    /// Manually release the lock.
    ///
    /// This is useful when you want to release the lock before the guard
    /// goes out of scope, and want to handle errors explicitly.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.lock.release()
    }
}

impl Deref for LockGuard<'_> {
    type Target = File;

    fn deref(&self) -> &File {
        match self.lock.file() {
            Some(file) => file,
            None => unreachable!("guard only exists while the lock is held"),
        }
    }
}

impl DerefMut for LockGuard<'_> {
    fn deref_mut(&mut self) -> &mut File {
        match self.lock.file_mut() {
            Some(file) => file,
            None => unreachable!("guard only exists while the lock is held"),
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.lock.release()
        {
            tracing::warn!(path = %self.lock.path().display(), error = %e, "failed to release lock");
        }
    }
}

//! Platform lock primitive.
//!
//! A [`Locker`] places or removes an OS lock on an open file handle in a
//! single call. [`SystemLocker`] delegates to `fs2`, which uses `flock(2)` on
//! POSIX (advisory, per open file description) and `LockFileEx` on Windows
//! (mandatory, byte range). The platform is fixed at compile time; nothing
//! above this module branches on it.
//!
//! The trait calls go through `fs2::FileExt` with fully qualified syntax so
//! they never resolve to the inherent `File` lock methods of newer std.

use crate::flags::LockFlags;
use fs2::FileExt;
use std::fmt;
use std::fs::File;
use std::io;

/// Outcome of a single lock attempt that did not hit a hard OS failure.
#[derive(Debug)]
pub enum LockStatus {
    /// The lock is now held through the given handle.
    Acquired,
    /// Someone else holds a conflicting lock. Carries the OS error.
    Contended(io::Error),
}

/// Single-call lock/unlock on an open file.
pub trait Locker: fmt::Debug + Send + Sync {
    /// Attempt to lock `file` in the mode described by `flags`.
    ///
    /// Without [`LockFlags::NON_BLOCKING`] the call waits until the lock is
    /// granted and never reports contention.
    fn try_lock(&self, file: &File, flags: LockFlags) -> io::Result<LockStatus>;

    /// Remove whatever lock `file` holds.
    fn unlock(&self, file: &File) -> io::Result<()>;
}

/// Default locker backed by the host's native file locks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLocker;

impl Locker for SystemLocker {
    fn try_lock(&self, file: &File, flags: LockFlags) -> io::Result<LockStatus> {
        let result = match (flags.is_shared(), flags.is_non_blocking()) {
            (true, true) => FileExt::try_lock_shared(file),
            (true, false) => FileExt::lock_shared(file),
            (false, true) => FileExt::try_lock_exclusive(file),
            (false, false) => FileExt::lock_exclusive(file),
        };

        match result {
            Ok(()) => Ok(LockStatus::Acquired),
            Err(e) if is_contention(&e) => Ok(LockStatus::Contended(e)),
            Err(e) => Err(e),
        }
    }

    fn unlock(&self, file: &File) -> io::Result<()> {
        FileExt::unlock(file)
    }
}

/// Whether `err` means "another handle holds a conflicting lock".
///
/// POSIX reports `EWOULDBLOCK`; Windows reports `ERROR_LOCK_VIOLATION`,
/// which `fs2::lock_contended_error` yields on that platform.
pub fn is_contention(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    match (err.raw_os_error(), fs2::lock_contended_error().raw_os_error()) {
        (Some(code), Some(contended)) => code == contended,
        _ => false,
    }
}

//! Portalock: cross-process advisory file locking.
//!
//! Locks are taken on open file handles through the operating system's
//! advisory locking calls, so they coordinate independent processes on the
//! same machine. On top of the basic [`Lock`] this crate provides a
//! reentrant lock, a self-deleting temporary lock, bounded semaphores over a
//! pool of lock files, and atomic file replacement.
//!
//! ```no_run
//! use portalock::{Lock, LockError};
//! use std::io::Write;
//! use std::time::Duration;
//!
//! fn update() -> Result<(), LockError> {
//!     let mut lock = Lock::new("/tmp/counter.lock").with_timeout(Duration::from_secs(2));
//!     let mut guard = lock.lock()?;
//!     writeln!(&mut *guard, "updated").map_err(|e| LockError::io("write failed", e))?;
//!     portalock::fs::open_atomic("/tmp/counter.txt", |file| file.write_all(b"42"))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod flags;
pub mod fs;
pub mod locks;
pub mod platform;

pub use config::{LockConfig, SemaphoreConfig};
pub use error::{LockError, Result};
pub use flags::LockFlags;
pub use locks::{
    AcquireOptions, BoundedSemaphore, Lock, LockGuard, LockMetadata, NamedBoundedSemaphore,
    OpenMode, ReentrantGuard, ReentrantLock, SemaphoreGuard, SlotSelection, TemporaryFileLock,
};
pub use platform::{LockStatus, Locker, SystemLocker};

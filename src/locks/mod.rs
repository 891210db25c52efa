//! Locking subsystem for portalock.
//!
//! - [`Lock`]: one lock file, acquired with a timeout and poll interval
//! - [`ReentrantLock`]: a `Lock` its holder can take repeatedly
//! - [`TemporaryFileLock`]: a `Lock` whose file is deleted on release
//! - [`BoundedSemaphore`] / [`NamedBoundedSemaphore`]: up to N holders over a
//!   pool of lock files
//!
//! # RAII Guards
//!
//! [`Lock::lock`], [`ReentrantLock::lock`] and [`BoundedSemaphore::guard`]
//! return guards that release on every exit path. Dropping a held lock
//! object also releases it, but only as a best-effort safety net: failures
//! there are logged, never raised.
//!
//! # Lock Files
//!
//! Lock files are plain files that are never deleted by `Lock` itself. Their
//! content does not matter; holders may record [`LockMetadata`] in them.

mod guard;
mod lock;
mod metadata;
mod rlock;
mod semaphore;
mod temporary;
mod types;


// Re-export public API
pub use guard::LockGuard;
pub use lock::Lock;
pub use metadata::LockMetadata;
pub use rlock::{ReentrantGuard, ReentrantLock};
pub use semaphore::{
    BoundedSemaphore, DEFAULT_FILENAME_PATTERN, DEFAULT_SEMAPHORE_NAME, NamedBoundedSemaphore,
    SemaphoreGuard,
};
pub use temporary::{DEFAULT_TEMPORARY_LOCK, TemporaryFileLock};
pub use types::{
    AcquireOptions, DEFAULT_CHECK_INTERVAL, DEFAULT_FAIL_WHEN_LOCKED, DEFAULT_TIMEOUT, OpenMode,
    SlotSelection,
};

//! Filesystem utilities for portalock.
//!
//! Atomic replacement is the lock-free way to publish a file: readers see
//! either the previous or the new content, never a mix.

pub mod atomic;

pub use atomic::{AtomicFile, atomic_write, atomic_write_file, open_atomic};

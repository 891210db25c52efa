//! Configuration for portalock.
//!
//! `LockConfig` holds the defaults a lock or semaphore is built with. It
//! supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.

mod model;
mod operations;

#[cfg(test)]
mod tests;

// Re-export public API
pub use model::{LockConfig, SemaphoreConfig};

//! Atomic file replacement.
//!
//! Instead of locking, the whole new content is written to a temporary file
//! and then renamed over the target, so readers only ever see the complete old
//! content or the complete new content.
//!
//! # Implementation Strategy
//!
//! 1. Create a uniquely named temporary file in the target's directory
//! 2. Let the caller write to it
//! 3. Flush and sync the file to disk (fsync), then close it
//! 4. Rename it over the target (the commit point)
//!
//! If anything fails before the rename, including the caller's own code
//! returning an error or panicking, the temporary file is deleted and the
//! target is left untouched.
//!
//! # Cross-Platform Behavior
//!
//! - **POSIX (Linux, macOS)**: `rename()` is atomic when source and
//!   destination are on the same filesystem. The parent directory is synced
//!   afterwards so the new entry is durable.
//! - **Windows**: `tempfile` replaces existing targets with `MoveFileExW`
//!   (`MOVEFILE_REPLACE_EXISTING`). Atomicity is likely but not guaranteed.

use crate::error::{LockError, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A pending atomic replacement of `target`.
///
/// Write through [`AtomicFile::as_file_mut`] or the [`Write`] impl, then call
/// [`AtomicFile::commit`]. Dropping without committing deletes the
/// temporary file and leaves the target alone.
#[derive(Debug)]
pub struct AtomicFile {
    target: PathBuf,
    temp: NamedTempFile,
}

impl AtomicFile {
    /// Create the temporary file next to `target`.
    ///
    /// Missing parent directories are created.
    pub fn create<P: AsRef<Path>>(target: P) -> Result<Self> {
        let target = absolute(target.as_ref())?;
        let parent = target.parent().unwrap_or(Path::new("."));

        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::io(
                    format!("failed to create parent directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let filename = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LockError::InvalidConfig(format!("invalid file path '{}'", target.display()))
            })?;

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{}.", filename))
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|e| {
                LockError::io(
                    format!("failed to create temporary file in '{}'", parent.display()),
                    e,
                )
            })?;

        tracing::debug!(path = %target.display(), temp = %temp.path().display(), "opened atomic writer");

        Ok(Self { target, temp })
    }

    /// The path that will be replaced on commit.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the temporary file.
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Writable handle to the temporary file.
    pub fn as_file_mut(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    /// Sync, close and rename the temporary file over the target.
    pub fn commit(self) -> Result<()> {
        let AtomicFile { target, mut temp } = self;

        temp.flush()
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| LockError::io("failed to sync temporary file to disk", e))?;

        // Close the handle before renaming; the TempPath still deletes the
        // file if the rename fails.
        let temp_path = temp.into_temp_path();
        temp_path.persist(&target).map_err(|e| {
            LockError::io(
                format!("failed to atomically replace '{}'", target.display()),
                e.error,
            )
        })?;

        sync_parent(&target);
        tracing::debug!(path = %target.display(), "committed atomic write");
        Ok(())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.as_file_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.as_file_mut().flush()
    }
}

/// Run `write` against a temporary file and commit it over `target` if it
/// succeeds.
///
/// On error (or panic) the temporary file is removed, the target is left as
/// it was, and the error is returned.
///
/// # Example
///
/// ```no_run
/// use portalock::fs::open_atomic;
/// use std::io::Write;
///
/// open_atomic("state.json", |file| file.write_all(b"{}"))?;
/// # Ok::<(), portalock::LockError>(())
/// ```
pub fn open_atomic<P, T, F>(target: P, write: F) -> Result<T>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<T>,
{
    let mut file = AtomicFile::create(target)?;
    let value = write(file.as_file_mut()).map_err(|e| {
        LockError::io(
            format!("failed to write replacement for '{}'", file.target().display()),
            e,
        )
    })?;
    file.commit()?;
    Ok(value)
}

/// Atomically write bytes to a file.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    open_atomic(path, |file| file.write_all(content))
}

/// Atomically write a string to a file.
///
/// Convenience wrapper around `atomic_write` for string content.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| LockError::io(format!("failed to resolve '{}'", path.display()), e))
}

#[cfg(unix)]
fn sync_parent(target: &Path) {
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent(_target: &Path) {}

//! Bounded semaphores across processes.
//!
//! A semaphore with `maximum = N` owns N candidate lock files built from a
//! name, a filename pattern and a directory. Acquiring races to lock any one
//! of them; at most N holders can succeed at once. Processes only exclude
//! each other if they agree on name, pattern, directory and maximum.
//!
//! Each slot attempt fails fast. Rounds over all slots repeat every
//! `check_interval` until `timeout` runs out.

use super::lock::Lock;
use super::types::{AcquireOptions, DEFAULT_CHECK_INTERVAL, DEFAULT_TIMEOUT, SlotSelection};
use crate::config::LockConfig;
use crate::error::{LockError, Result};
use crate::flags::LockFlags;
use crate::platform::{Locker, SystemLocker};
use rand::Rng;
use rand::seq::SliceRandom;
use std::fs;
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Name used when none is given. Unrelated programs using it would share
/// slots, so it is deprecated in favour of [`NamedBoundedSemaphore`].
pub const DEFAULT_SEMAPHORE_NAME: &str = "bounded_semaphore";

/// `{name}` is replaced by the semaphore name, `{number}` by the slot index
/// zero-padded to two digits.
pub const DEFAULT_FILENAME_PATTERN: &str = "{name}.{number}.lock";

/// Shortest pause between two rounds of slot attempts.
const MIN_ROUND_SLEEP: Duration = Duration::from_millis(1);

/// Slots are exclusive, or more than `maximum` holders could share them.
const SLOT_FLAGS: LockFlags = LockFlags::EXCLUSIVE.union(LockFlags::NON_BLOCKING);

/// A bounded semaphore backed by a pool of lock files.
#[derive(Debug)]
pub struct BoundedSemaphore {
    maximum: usize,
    name: String,
    pattern: String,
    directory: PathBuf,
    timeout: Duration,
    check_interval: Duration,
    fail_when_locked: bool,
    selection: SlotSelection,
    locker: Arc<dyn Locker>,
    lock: Option<Lock>,
}

impl BoundedSemaphore {
    /// Create a semaphore with `maximum` slots.
    ///
    /// An empty name or the default name logs a deprecation warning; use
    /// [`NamedBoundedSemaphore`] instead.
    pub fn new<S: Into<String>>(maximum: usize, name: S) -> Self {
        let name = name.into();
        if name.is_empty() || name == DEFAULT_SEMAPHORE_NAME {
            tracing::warn!(
                "BoundedSemaphore without an explicit name is deprecated, use NamedBoundedSemaphore"
            );
        }
        Self::unchecked(maximum, name)
    }

    fn unchecked(maximum: usize, name: String) -> Self {
        Self {
            maximum,
            name,
            pattern: DEFAULT_FILENAME_PATTERN.to_string(),
            directory: std::env::temp_dir(),
            timeout: DEFAULT_TIMEOUT,
            check_interval: DEFAULT_CHECK_INTERVAL,
            fail_when_locked: true,
            selection: SlotSelection::default(),
            locker: Arc::new(SystemLocker),
            lock: None,
        }
    }

    /// Apply the timing, pattern, directory and selection settings of
    /// `config`.
    #[must_use]
    pub fn with_config(self, config: &LockConfig) -> Self {
        let semaphore = &config.semaphore;
        let configured = self
            .with_pattern(semaphore.pattern.clone())
            .with_timeout(config.timeout())
            .with_check_interval(config.check_interval())
            .with_fail_when_locked(semaphore.fail_when_locked)
            .with_selection(semaphore.selection());
        match &semaphore.directory {
            Some(directory) => configured.with_directory(directory.clone()),
            None => configured,
        }
    }

    #[must_use]
    pub fn with_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.directory = directory.into();
        self
    }

    #[must_use]
    pub fn with_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.pattern = pattern.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    #[must_use]
    pub fn with_fail_when_locked(mut self, fail_when_locked: bool) -> Self {
        self.fail_when_locked = fail_when_locked;
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: SlotSelection) -> Self {
        self.selection = selection;
        self
    }

    #[must_use]
    pub fn with_locker(mut self, locker: Arc<dyn Locker>) -> Self {
        self.locker = locker;
        self
    }

    pub fn maximum(&self) -> usize {
        self.maximum
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn selection(&self) -> SlotSelection {
        self.selection
    }

    pub fn is_held(&self) -> bool {
        self.lock.is_some()
    }

    /// Path of the slot currently held.
    pub fn held_path(&self) -> Option<&Path> {
        self.lock.as_ref().map(|lock| lock.path())
    }

    /// All candidate lock files, slot 0 first.
    pub fn filenames(&self) -> Vec<PathBuf> {
        (0..self.maximum)
            .map(|number| self.directory.join(self.slot_filename(number)))
            .collect()
    }

    /// All candidate lock files in random order.
    pub fn random_filenames(&self) -> Vec<PathBuf> {
        let mut filenames = self.filenames();
        filenames.shuffle(&mut rand::thread_rng());
        filenames
    }

    fn slot_filename(&self, number: usize) -> String {
        self.pattern
            .replace("{name}", &self.name)
            .replace("{number}", &format!("{:02}", number))
    }

    fn candidates(&self) -> Vec<PathBuf> {
        match self.selection {
            SlotSelection::Sequential => self.filenames(),
            SlotSelection::Randomized => self.random_filenames(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.maximum == 0 {
            return Err(LockError::InvalidConfig(format!(
                "semaphore '{}' needs at least one slot",
                self.name
            )));
        }
        if !self.pattern.contains("{number}") {
            return Err(LockError::InvalidConfig(format!(
                "semaphore filename pattern '{}' must contain {{number}}",
                self.pattern
            )));
        }
        if self.check_interval.is_zero() {
            return Err(LockError::InvalidConfig(
                "semaphore check interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn acquire(&mut self) -> Result<&Path> {
        self.acquire_with(AcquireOptions::default())
    }

    /// Lock one free slot.
    ///
    /// # Errors
    ///
    /// * `AlreadyHeld` - this instance already holds a slot
    /// * `AlreadyLocked` - every slot stayed taken and `fail_when_locked` is set
    /// * `Timeout` - every slot stayed taken and `fail_when_locked` is not set
    /// * `InvalidConfig` / `Io` - bad settings or an OS failure
    pub fn acquire_with(&mut self, options: AcquireOptions) -> Result<&Path> {
        if let Some(lock) = &self.lock {
            return Err(LockError::AlreadyHeld(lock.path().display().to_string()));
        }
        self.validate()?;

        let timeout = options.timeout.unwrap_or(self.timeout);
        let check_interval = options.check_interval.unwrap_or(self.check_interval);
        let fail_when_locked = options.fail_when_locked.unwrap_or(self.fail_when_locked);

        if !self.directory.exists() {
            fs::create_dir_all(&self.directory).map_err(|e| {
                LockError::io(
                    format!(
                        "failed to create semaphore directory '{}'",
                        self.directory.display()
                    ),
                    e,
                )
            })?;
        }

        let started = Instant::now();
        let mut round: u32 = 0;
        loop {
            tracing::debug!(name = %self.name, round, "trying semaphore slots");
            if let Some(lock) = self.try_slots(timeout, check_interval)? {
                tracing::debug!(name = %self.name, path = %lock.path().display(), "semaphore slot acquired");
                return Ok(self.lock.insert(lock).path());
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                break;
            }
            round += 1;
            let due = check_interval.saturating_mul(round);
            thread::sleep(due.saturating_sub(elapsed).max(MIN_ROUND_SLEEP));
        }

        let message = format!(
            "all {} slots of semaphore '{}' are locked",
            self.maximum, self.name
        );
        if fail_when_locked {
            Err(LockError::AlreadyLocked(message))
        } else {
            Err(LockError::Timeout {
                path: self.directory.clone(),
                timeout,
                source: io::Error::new(io::ErrorKind::WouldBlock, message),
            })
        }
    }

    /// One fail-fast attempt on every candidate.
    fn try_slots(&self, timeout: Duration, check_interval: Duration) -> Result<Option<Lock>> {
        for path in self.candidates() {
            tracing::trace!(path = %path.display(), "trying semaphore slot");
            let mut lock = Lock::new(path)
                .with_flags(SLOT_FLAGS)
                .with_timeout(timeout)
                .with_check_interval(check_interval)
                .with_fail_when_locked(true)
                .with_locker(Arc::clone(&self.locker));

            let outcome = lock.acquire().map(|_| ());
            match outcome {
                Ok(()) => return Ok(Some(lock)),
                Err(LockError::AlreadyLocked(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Release the held slot. Does nothing when no slot is held.
    pub fn release(&mut self) -> Result<()> {
        if let Some(mut lock) = self.lock.take() {
            lock.release()?;
        }
        Ok(())
    }

    /// Acquire a slot and return a guard that releases it when dropped.
    pub fn guard(&mut self) -> Result<SemaphoreGuard<'_>> {
        self.acquire()?;
        Ok(SemaphoreGuard {
            semaphore: self,
            released: false,
        })
    }
}

/// Releases a [`BoundedSemaphore`] slot when dropped.
#[derive(Debug)]
pub struct SemaphoreGuard<'a> {
    semaphore: &'a mut BoundedSemaphore,
    released: bool,
}

impl SemaphoreGuard<'_> {
    /// Path of the held slot.
    pub fn path(&self) -> Option<&Path> {
        self.semaphore.held_path()
    }

    /// Release explicitly, reporting errors.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.semaphore.release()
    }
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.semaphore.release()
        {
            tracing::warn!(name = %self.semaphore.name, error = %e, "failed to release semaphore slot");
        }
    }
}

/// A [`BoundedSemaphore`] with a caller-chosen or random name.
///
/// Without a name, one is generated (`bounded_semaphore.<n>`). Other
/// processes can only share the semaphore if they are told that name.
#[derive(Debug)]
pub struct NamedBoundedSemaphore {
    inner: BoundedSemaphore,
}

impl NamedBoundedSemaphore {
    pub fn new(maximum: usize, name: Option<&str>) -> Self {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!(
                "{}.{}",
                DEFAULT_SEMAPHORE_NAME,
                rand::thread_rng().gen_range(0..=1_000_000)
            ),
        };
        Self {
            inner: BoundedSemaphore::unchecked(maximum, name),
        }
    }

    fn map(self, f: impl FnOnce(BoundedSemaphore) -> BoundedSemaphore) -> Self {
        Self { inner: f(self.inner) }
    }

    #[must_use]
    pub fn with_config(self, config: &LockConfig) -> Self {
        self.map(|s| s.with_config(config))
    }

    #[must_use]
    pub fn with_directory<P: Into<PathBuf>>(self, directory: P) -> Self {
        self.map(|s| s.with_directory(directory))
    }

    #[must_use]
    pub fn with_pattern<S: Into<String>>(self, pattern: S) -> Self {
        self.map(|s| s.with_pattern(pattern))
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.map(|s| s.with_timeout(timeout))
    }

    #[must_use]
    pub fn with_check_interval(self, check_interval: Duration) -> Self {
        self.map(|s| s.with_check_interval(check_interval))
    }

    #[must_use]
    pub fn with_fail_when_locked(self, fail_when_locked: bool) -> Self {
        self.map(|s| s.with_fail_when_locked(fail_when_locked))
    }

    #[must_use]
    pub fn with_selection(self, selection: SlotSelection) -> Self {
        self.map(|s| s.with_selection(selection))
    }

    pub fn into_inner(self) -> BoundedSemaphore {
        self.inner
    }
}

impl Deref for NamedBoundedSemaphore {
    type Target = BoundedSemaphore;

    fn deref(&self) -> &BoundedSemaphore {
        &self.inner
    }
}

impl DerefMut for NamedBoundedSemaphore {
    fn deref_mut(&mut self) -> &mut BoundedSemaphore {
        &mut self.inner
    }
}

//! Config loading, validation, and conversion helpers.

use super::model::LockConfig;
use crate::error::{LockError, Result};
use crate::flags::LockFlags;
use crate::locks::{DEFAULT_CHECK_INTERVAL, DEFAULT_TIMEOUT};
use std::path::Path;
use std::time::Duration;

impl LockConfig {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(LockConfig)` - Successfully loaded and validated config
    /// * `Err(LockError::InvalidConfig)` - Parse error or validation failure
    /// * `Err(LockError::Io)` - The file could not be read
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockError::io(
                format!("failed to read config file '{}'", path.display()),
                e,
            )
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: LockConfig = serde_yaml::from_str(yaml)
            .map_err(|e| LockError::InvalidConfig(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            LockError::InvalidConfig(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `timeout_secs` must be finite and not negative
    /// - `check_interval_secs` must be finite and positive
    /// - `semaphore.pattern` must contain `{number}`
    pub fn validate(&self) -> Result<()> {
        if !self.timeout_secs.is_finite() || self.timeout_secs < 0.0 {
            return Err(LockError::InvalidConfig(
                "timeout_secs must be a non-negative number".to_string(),
            ));
        }

        if !self.check_interval_secs.is_finite() || self.check_interval_secs <= 0.0 {
            return Err(LockError::InvalidConfig(
                "check_interval_secs must be greater than 0".to_string(),
            ));
        }

        if !self.semaphore.pattern.contains("{number}") {
            return Err(LockError::InvalidConfig(format!(
                "semaphore.pattern must contain {{number}} (found '{}')",
                self.semaphore.pattern
            )));
        }

        Ok(())
    }

    /// The acquisition timeout. Falls back to the default if out of range.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(DEFAULT_TIMEOUT)
    }

    /// The poll interval. Falls back to the default if out of range.
    pub fn check_interval(&self) -> Duration {
        match Duration::try_from_secs_f64(self.check_interval_secs) {
            Ok(interval) if !interval.is_zero() => interval,
            _ => DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Lock flags described by `shared` and `blocking`.
    pub fn flags(&self) -> LockFlags {
        let mut flags = if self.shared {
            LockFlags::SHARED
        } else {
            LockFlags::EXCLUSIVE
        };
        if !self.blocking {
            flags |= LockFlags::NON_BLOCKING;
        }
        flags
    }
}

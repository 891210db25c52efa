//! Lock flags.
//!
//! Lock types:
//! - [`LockFlags::EXCLUSIVE`]: one holder, everyone else excluded
//! - [`LockFlags::SHARED`]: many holders, exclusive holders excluded
//!
//! Modifiers:
//! - [`LockFlags::NON_BLOCKING`]: return immediately on contention
//!
//! [`LockFlags::UNBLOCK`] (unlock) exists for parity with the platform
//! constants; releasing goes through [`crate::platform::Locker::unlock`].
//!
//! The numeric values follow the host platform: `flock(2)` constants on
//! POSIX, the msvcrt-style values on Windows.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

#[cfg(unix)]
mod raw {
    pub const LOCK_SH: i32 = 1;
    pub const LOCK_EX: i32 = 2;
    pub const LOCK_NB: i32 = 4;
    pub const LOCK_UN: i32 = 8;
}

#[cfg(windows)]
mod raw {
    pub const LOCK_EX: i32 = 1;
    pub const LOCK_SH: i32 = 2;
    pub const LOCK_NB: i32 = 4;
    // msvcrt LK_UNLCK
    pub const LOCK_UN: i32 = 0;
}

/// Bitset of lock mode and modifier flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockFlags(i32);

impl LockFlags {
    pub const EXCLUSIVE: LockFlags = LockFlags(raw::LOCK_EX);
    pub const SHARED: LockFlags = LockFlags(raw::LOCK_SH);
    pub const NON_BLOCKING: LockFlags = LockFlags(raw::LOCK_NB);
    pub const UNBLOCK: LockFlags = LockFlags(raw::LOCK_UN);

    /// Platform value of the flag set.
    pub const fn bits(self) -> i32 {
        self.0
    }

    /// `self | other`, usable in constants.
    pub const fn union(self, other: LockFlags) -> LockFlags {
        LockFlags(self.0 | other.0)
    }

    /// Whether every bit of `other` is set in `self`.
    ///
    /// An empty `other` (such as `UNBLOCK` on Windows) is never contained.
    pub const fn contains(self, other: LockFlags) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Whether an attempt with these flags takes a shared lock.
    ///
    /// Exclusive wins when both modes are present.
    pub const fn is_shared(self) -> bool {
        self.contains(Self::SHARED) && !self.contains(Self::EXCLUSIVE)
    }

    /// Whether the platform call should fail immediately on contention.
    pub const fn is_non_blocking(self) -> bool {
        self.contains(Self::NON_BLOCKING)
    }
}

impl Default for LockFlags {
    /// `EXCLUSIVE | NON_BLOCKING`
    fn default() -> Self {
        LockFlags(raw::LOCK_EX | raw::LOCK_NB)
    }
}

impl BitOr for LockFlags {
    type Output = LockFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        LockFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for LockFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for LockFlags {
    type Output = LockFlags;

    fn bitand(self, rhs: Self) -> Self::Output {
        LockFlags(self.0 & rhs.0)
    }
}

impl fmt::Debug for LockFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::EXCLUSIVE) {
            names.push("EXCLUSIVE");
        }
        if self.contains(Self::SHARED) {
            names.push("SHARED");
        }
        if self.contains(Self::NON_BLOCKING) {
            names.push("NON_BLOCKING");
        }
        if self.contains(Self::UNBLOCK) {
            names.push("UNBLOCK");
        }
        write!(f, "LockFlags({})", names.join(" | "))
    }
}

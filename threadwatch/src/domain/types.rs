//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent mixing up process and thread identifiers,
//! and keep the 100ns counter unit explicit in signatures.

use std::fmt;

/// Number of 100ns counter units in one millisecond.
pub const HUNDRED_NS_PER_MS: i64 = 10_000;

/// Process ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

/// Thread ID
///
/// Stable OS identifier of a thread. Ordered so records can be sorted by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(pub u32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

/// Cumulative execution-time counters of a thread, in 100ns units.
///
/// Counters are monotonic for a live thread. Signed so that a delta against a
/// stale baseline can be represented without wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub kernel: i64,
    pub user: i64,
}

impl CpuTimes {
    pub const ZERO: Self = Self { kernel: 0, user: 0 };

    #[must_use]
    pub fn new(kernel: i64, user: i64) -> Self {
        Self { kernel, user }
    }

    /// Kernel plus user time.
    #[must_use]
    pub fn total(self) -> i64 {
        self.kernel + self.user
    }

    /// Kernel plus user time in whole milliseconds (truncating).
    #[must_use]
    pub fn total_ms(self) -> i64 {
        self.total() / HUNDRED_NS_PER_MS
    }
}

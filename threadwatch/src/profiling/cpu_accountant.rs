//! CPU accounting from cumulative execution-time counters
//!
//! Usage is a rate, so it needs two counter readings and the wall-clock time
//! between them. All arithmetic is truncating `i64` in a fixed order so the
//! displayed percentages match the legacy values exactly.

use crate::domain::{CpuTimes, HUNDRED_NS_PER_MS};

/// Sentinel for "unknown" in both output fields.
pub const UNKNOWN: i64 = -1;

/// Derived CPU metrics for one thread and one refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuUsage {
    /// Percent of one CPU over the interval, or [`UNKNOWN`]. Not clamped:
    /// a thread hopping across cores or a counter anomaly can exceed 100.
    pub usage_percent: i64,
    /// Cumulative kernel + user milliseconds, or [`UNKNOWN`].
    pub total_ms: i64,
}

/// Compute usage and total from two snapshots `elapsed_ms` apart.
///
/// `total_ms` is always derived from `cur`. `usage_percent` stays unknown when
/// `elapsed_ms <= 0`, which covers a clock that stepped backwards and two
/// readings inside the same millisecond.
#[must_use]
pub fn account_cpu(prev: CpuTimes, cur: CpuTimes, elapsed_ms: i64) -> CpuUsage {
    let total_ms = cur.total_ms();

    if elapsed_ms <= 0 {
        return CpuUsage { usage_percent: UNKNOWN, total_ms };
    }

    let kernel_delta = cur.kernel - prev.kernel;
    let user_delta = cur.user - prev.user;
    // Multiply before the final divide
    let usage_percent = ((kernel_delta + user_delta) / HUNDRED_NS_PER_MS) * 100 / elapsed_ms;

    CpuUsage { usage_percent, total_ms }
}

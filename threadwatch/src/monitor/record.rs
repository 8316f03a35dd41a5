//! Per-thread state

use log::trace;

use crate::domain::{CpuTimes, ProfilerError, Tid, TimingError};
use crate::profiling::cpu_accountant::{self, CpuUsage};
use crate::profiling::UNKNOWN_LOCATION;
use crate::providers::{ThreadEntry, ThreadHandle};

/// One monitored thread.
///
/// Identity is the thread id, fixed at creation. CPU fields are rewritten
/// together on every CPU pass; location and modules are reset at the start of
/// every sampling pass and only refilled by a fresh sample.
#[derive(Debug, Clone)]
pub struct ThreadRecord {
    tid: Tid,
    handle: Option<ThreadHandle>,
    prev_times: CpuTimes,
    cpu_usage: i64,
    total_cpu_ms: i64,
    location: String,
    modules: String,
}

impl ThreadRecord {
    #[must_use]
    pub fn new(entry: &ThreadEntry) -> Self {
        Self {
            tid: entry.tid,
            handle: entry.handle,
            prev_times: CpuTimes::ZERO,
            cpu_usage: cpu_accountant::UNKNOWN,
            total_cpu_ms: cpu_accountant::UNKNOWN,
            location: UNKNOWN_LOCATION.to_string(),
            modules: UNKNOWN_LOCATION.to_string(),
        }
    }

    #[must_use]
    pub fn tid(&self) -> Tid {
        self.tid
    }

    /// The OS thread handle, if one could be opened.
    ///
    /// # Errors
    /// [`ProfilerError::HandleUnavailable`] when the provider gave no handle.
    pub fn handle(&self) -> Result<ThreadHandle, ProfilerError> {
        self.handle.ok_or(ProfilerError::HandleUnavailable(self.tid))
    }

    /// Counters observed on the last successful query.
    #[must_use]
    pub fn prev_times(&self) -> CpuTimes {
        self.prev_times
    }

    /// Usage percent, `-1` when unknown.
    #[must_use]
    pub fn cpu_usage(&self) -> i64 {
        self.cpu_usage
    }

    /// Cumulative CPU milliseconds, `-1` when unknown.
    #[must_use]
    pub fn total_cpu_ms(&self) -> i64 {
        self.total_cpu_ms
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn modules(&self) -> &str {
        &self.modules
    }

    /// Apply one CPU pass.
    ///
    /// A failed query leaves both outputs unknown and keeps the previous
    /// counters, so the next successful pass still has a valid baseline.
    pub fn apply_times(&mut self, query: Result<CpuTimes, TimingError>, elapsed_ms: i64) {
        match query {
            Ok(current) => {
                let CpuUsage { usage_percent, total_ms } =
                    cpu_accountant::account_cpu(self.prev_times, current, elapsed_ms);
                self.prev_times = current;
                self.cpu_usage = usage_percent;
                self.total_cpu_ms = total_ms;
            }
            Err(e) => {
                trace!("CPU times unavailable for {}: {e}", self.tid);
                self.cpu_usage = cpu_accountant::UNKNOWN;
                self.total_cpu_ms = cpu_accountant::UNKNOWN;
            }
        }
    }

    /// Forget the previous sample.
    pub fn reset_sample(&mut self) {
        UNKNOWN_LOCATION.clone_into(&mut self.location);
        UNKNOWN_LOCATION.clone_into(&mut self.modules);
    }

    /// Store a fresh sample.
    pub fn set_sample(&mut self, location: String, modules: String) {
        self.location = location;
        self.modules = modules;
    }

    /// `"42%"`, or `"-"` when unknown.
    #[must_use]
    pub fn cpu_usage_display(&self) -> String {
        if self.cpu_usage >= 0 {
            format!("{}%", self.cpu_usage)
        } else {
            UNKNOWN_LOCATION.to_string()
        }
    }

    /// Seconds with one decimal (`"1.5 s"`), or `"-"` when unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // display only
    pub fn total_cpu_display(&self) -> String {
        if self.total_cpu_ms >= 0 {
            format!("{:.1} s", self.total_cpu_ms as f64 / 1000.0)
        } else {
            UNKNOWN_LOCATION.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Pid;

    fn record() -> ThreadRecord {
        ThreadRecord::new(&ThreadEntry::open(Pid(1), Tid(5)))
    }

    #[test]
    fn test_new_record_is_unknown() {
        let r = record();
        assert_eq!(r.tid(), Tid(5));
        assert_eq!(r.cpu_usage(), -1);
        assert_eq!(r.total_cpu_ms(), -1);
        assert_eq!(r.location(), "-");
        assert_eq!(r.modules(), "-");
        assert_eq!(r.cpu_usage_display(), "-");
        assert_eq!(r.total_cpu_display(), "-");
    }

    #[test]
    fn test_missing_handle() {
        let r = ThreadRecord::new(&ThreadEntry { tid: Tid(8), handle: None });
        assert!(matches!(r.handle(), Err(ProfilerError::HandleUnavailable(Tid(8)))));
    }

    #[test]
    fn test_apply_times_updates_baseline() {
        let mut r = record();
        r.apply_times(Ok(CpuTimes::new(5_000_000, 5_000_000)), 2000);
        assert_eq!(r.cpu_usage(), 50);
        assert_eq!(r.total_cpu_ms(), 1000);
        assert_eq!(r.prev_times(), CpuTimes::new(5_000_000, 5_000_000));
        assert_eq!(r.cpu_usage_display(), "50%");
        assert_eq!(r.total_cpu_display(), "1.0 s");
    }

    #[test]
    fn test_failed_query_keeps_baseline() {
        let mut r = record();
        r.apply_times(Ok(CpuTimes::new(100_000, 200_000)), 1000);
        let baseline = r.prev_times();

        r.apply_times(Err(TimingError::ThreadGone(Tid(5))), 1000);
        assert_eq!(r.cpu_usage(), -1);
        assert_eq!(r.total_cpu_ms(), -1);
        assert_eq!(r.prev_times(), baseline);

        // Next success measures against the preserved baseline
        r.apply_times(Ok(CpuTimes::new(100_000, 10_200_000)), 2000);
        assert_eq!(r.cpu_usage(), 50);
    }

    #[test]
    fn test_sample_reset() {
        let mut r = record();
        r.set_sample("worker::run".to_string(), "app".to_string());
        assert_eq!(r.location(), "worker::run");
        r.reset_sample();
        assert_eq!(r.location(), "-");
        assert_eq!(r.modules(), "-");
    }
}

use serde::{Deserialize, Serialize};

use crate::monitor::{SortDirection, SortKey, ThreadMonitor, ThreadRecord};

/// One row of the monitor, as of a refresh.
///
/// Unknown values (the `-1` and `"-"` sentinels of a record) are `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub tid: u32,
    pub cpu_usage: Option<i64>,
    pub total_cpu_ms: Option<i64>,
    pub location: Option<String>,
    pub modules: Option<String>,
}

impl ThreadSnapshot {
    #[must_use]
    pub fn capture(record: &ThreadRecord) -> Self {
        let known = |value: i64| (value >= 0).then_some(value);
        let text = |value: &str| (value != "-").then(|| value.to_string());

        Self {
            tid: record.tid().0,
            cpu_usage: known(record.cpu_usage()),
            total_cpu_ms: known(record.total_cpu_ms()),
            location: text(record.location()),
            modules: text(record.modules()),
        }
    }
}

/// The whole record collection at one instant, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub pid: Option<u32>,
    /// Clock reading of the CPU pass the values come from
    pub captured_at_ms: i64,
    pub sort_key: SortKey,
    pub direction: SortDirection,
    pub threads: Vec<ThreadSnapshot>,
}

impl MonitorSnapshot {
    #[must_use]
    pub fn capture(monitor: &ThreadMonitor) -> Self {
        let ordering = monitor.ordering();
        Self {
            pid: monitor.process().map(|p| p.pid.0),
            captured_at_ms: monitor.last_refresh_ms(),
            sort_key: ordering.key(),
            direction: ordering.direction(),
            threads: monitor.records().iter().map(ThreadSnapshot::capture).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CpuTimes, Pid, Tid, TimingError};
    use crate::providers::ThreadEntry;

    #[test]
    fn test_unknown_values_become_null() {
        let record = ThreadRecord::new(&ThreadEntry { tid: Tid(7), handle: None });
        let snapshot = ThreadSnapshot::capture(&record);
        assert_eq!(snapshot.tid, 7);
        assert_eq!(snapshot.cpu_usage, None);
        assert_eq!(snapshot.total_cpu_ms, None);
        assert_eq!(snapshot.location, None);
        assert_eq!(snapshot.modules, None);
    }

    #[test]
    fn test_known_values_kept() {
        let mut record = ThreadRecord::new(&ThreadEntry::open(Pid(1), Tid(2)));
        record.apply_times(Ok(CpuTimes::new(0, 0)), 1000);
        record.apply_times(Ok(CpuTimes::new(1_000_000, 4_000_000)), 1000);
        record.set_sample("worker::run".to_string(), "server".to_string());

        let snapshot = ThreadSnapshot::capture(&record);
        assert_eq!(snapshot.cpu_usage, Some(50));
        assert_eq!(snapshot.total_cpu_ms, Some(500));
        assert_eq!(snapshot.location.as_deref(), Some("worker::run"));
        assert_eq!(snapshot.modules.as_deref(), Some("server"));

        record.apply_times(Err(TimingError::ThreadGone(Tid(2))), 1000);
        assert_eq!(ThreadSnapshot::capture(&record).cpu_usage, None);
    }
}

//! Record ordering for display
//!
//! A single active key and direction, applied with a stable sort so records
//! that compare equal keep their relative order between refreshes.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::record::ThreadRecord;

/// Column the records are ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Location,
    CpuUsage,
    TotalCpu,
    ThreadId,
}

impl SortKey {
    /// Direction used the first time this key is selected.
    #[must_use]
    pub fn default_direction(self) -> SortDirection {
        match self {
            SortKey::Location | SortKey::ThreadId => SortDirection::Ascending,
            SortKey::CpuUsage | SortKey::TotalCpu => SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Active key and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadOrdering {
    key: SortKey,
    direction: SortDirection,
}

impl Default for ThreadOrdering {
    /// Busiest threads first.
    fn default() -> Self {
        Self { key: SortKey::CpuUsage, direction: SortDirection::Descending }
    }
}

impl ThreadOrdering {
    #[must_use]
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Ordering on `key` in its default direction.
    #[must_use]
    pub fn by(key: SortKey) -> Self {
        Self::new(key, key.default_direction())
    }

    #[must_use]
    pub fn key(&self) -> SortKey {
        self.key
    }

    #[must_use]
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Column-header click: the active key flips direction, any other key
    /// becomes active in its default direction.
    pub fn select(&mut self, key: SortKey) {
        if key == self.key {
            self.direction = self.direction.toggled();
        } else {
            self.key = key;
            self.direction = key.default_direction();
        }
    }

    /// Compare two records under this ordering.
    #[must_use]
    pub fn compare(&self, a: &ThreadRecord, b: &ThreadRecord) -> Ordering {
        let primary = match self.key {
            SortKey::Location => a.location().cmp(b.location()),
            // Equal usage falls back to cumulative time, same direction
            SortKey::CpuUsage => a
                .cpu_usage()
                .cmp(&b.cpu_usage())
                .then_with(|| a.total_cpu_ms().cmp(&b.total_cpu_ms())),
            SortKey::TotalCpu => a.total_cpu_ms().cmp(&b.total_cpu_ms()),
            SortKey::ThreadId => a.tid().cmp(&b.tid()),
        };
        self.direction.apply(primary)
    }

    /// Stable in-place sort.
    pub fn sort(&self, records: &mut [ThreadRecord]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CpuTimes, Pid, Tid};
    use crate::providers::ThreadEntry;

    /// Record with usage/total derived from a one-second interval.
    fn record(tid: u32, usage_ms: i64, total_ms: i64) -> ThreadRecord {
        let mut r = ThreadRecord::new(&ThreadEntry::open(Pid(1), Tid(tid)));
        // Baseline so that the delta is usage_ms and the total is total_ms
        r.apply_times(Ok(CpuTimes::new(0, (total_ms - usage_ms) * 10_000)), 0);
        r.apply_times(Ok(CpuTimes::new(0, total_ms * 10_000)), 1000);
        r
    }

    fn tids(records: &[ThreadRecord]) -> Vec<u32> {
        records.iter().map(|r| r.tid().0).collect()
    }

    #[test]
    fn test_default_ordering() {
        let ordering = ThreadOrdering::default();
        assert_eq!(ordering.key(), SortKey::CpuUsage);
        assert_eq!(ordering.direction(), SortDirection::Descending);
    }

    #[test]
    fn test_default_directions() {
        assert_eq!(SortKey::Location.default_direction(), SortDirection::Ascending);
        assert_eq!(SortKey::CpuUsage.default_direction(), SortDirection::Descending);
        assert_eq!(SortKey::TotalCpu.default_direction(), SortDirection::Descending);
        assert_eq!(SortKey::ThreadId.default_direction(), SortDirection::Ascending);
    }

    #[test]
    fn test_select_toggles_and_switches() {
        let mut ordering = ThreadOrdering::default();
        ordering.select(SortKey::CpuUsage);
        assert_eq!(ordering.direction(), SortDirection::Ascending);
        ordering.select(SortKey::CpuUsage);
        assert_eq!(ordering.direction(), SortDirection::Descending);

        ordering.select(SortKey::ThreadId);
        assert_eq!(ordering, ThreadOrdering::new(SortKey::ThreadId, SortDirection::Ascending));
        ordering.select(SortKey::TotalCpu);
        assert_eq!(ordering, ThreadOrdering::new(SortKey::TotalCpu, SortDirection::Descending));
    }

    #[test]
    fn test_cpu_ties_broken_by_total_same_direction() {
        let mut records =
            vec![record(1, 10, 500), record(2, 20, 100), record(3, 10, 900), record(4, 10, 50)];

        ThreadOrdering::new(SortKey::CpuUsage, SortDirection::Descending).sort(&mut records);
        assert_eq!(tids(&records), vec![2, 3, 1, 4]);

        ThreadOrdering::new(SortKey::CpuUsage, SortDirection::Ascending).sort(&mut records);
        assert_eq!(tids(&records), vec![4, 1, 3, 2]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut records = vec![record(9, 0, 100), record(3, 0, 100), record(7, 0, 100)];
        ThreadOrdering::by(SortKey::TotalCpu).sort(&mut records);
        assert_eq!(tids(&records), vec![9, 3, 7]);
        ThreadOrdering::by(SortKey::Location).sort(&mut records);
        assert_eq!(tids(&records), vec![9, 3, 7]);
    }

    #[test]
    fn test_sort_by_location() {
        let mut records = vec![record(1, 0, 0), record(2, 0, 0), record(3, 0, 0)];
        records[0].set_sample("read".to_string(), "-".to_string());
        records[1].set_sample("epoll_wait".to_string(), "-".to_string());
        records[2].set_sample("main".to_string(), "-".to_string());

        ThreadOrdering::by(SortKey::Location).sort(&mut records);
        assert_eq!(tids(&records), vec![2, 3, 1]);
    }

    #[test]
    fn test_sort_by_thread_id() {
        let mut records = vec![record(30, 0, 0), record(10, 0, 0), record(20, 0, 0)];
        let mut ordering = ThreadOrdering::default();
        ordering.select(SortKey::ThreadId);
        ordering.sort(&mut records);
        assert_eq!(tids(&records), vec![10, 20, 30]);
        ordering.select(SortKey::ThreadId);
        ordering.sort(&mut records);
        assert_eq!(tids(&records), vec![30, 20, 10]);
    }
}

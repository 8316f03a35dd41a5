//! Thread enumeration and execution time counters from /proc
//!
//! `/proc/<pid>/task/<tid>/stat` reports `utime` and `stime` in clock ticks
//! (fields 14 and 15). They are converted to the 100ns counter unit used by
//! the rest of the crate.

#![allow(unsafe_code)] // sysconf() requires unsafe

use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use crate::domain::{CpuTimes, Pid, Tid, TimingError};
use crate::process_lookup::extract_comm;
use crate::providers::{ProcessHandle, ProcessProvider, ProcessSnapshot, ThreadEntry, ThreadHandle, TimingSource};

/// 100ns units per second
const HUNDRED_NS_PER_SEC: i64 = 10_000_000;

/// Used when sysconf cannot report the tick rate
const FALLBACK_CLOCK_TICKS: i64 = 100;

/// True when `/proc/<pid>` exists.
#[must_use]
pub fn process_exists(pid: Pid) -> bool {
    Path::new(&format!("/proc/{}", pid.0)).exists()
}

/// Thread ids of a process, read from `/proc/<pid>/task` and sorted.
///
/// # Errors
/// Returns an error if the task directory cannot be read
pub fn list_threads(pid: Pid) -> Result<Vec<Tid>> {
    let task_dir = format!("/proc/{}/task", pid.0);
    let entries = fs::read_dir(&task_dir).with_context(|| format!("Failed to read {task_dir}"))?;

    let mut tids: Vec<Tid> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            entry.file_name().to_str()?.parse::<u32>().ok().map(Tid)
        })
        .collect();

    // Directory order is arbitrary; keep enumeration deterministic
    tids.sort_unstable();
    Ok(tids)
}

/// [`ProcessProvider`] for a fixed pid.
#[derive(Debug, Clone, Copy)]
pub struct ProcfsProcess {
    pid: Pid,
}

impl ProcfsProcess {
    #[must_use]
    pub fn new(pid: Pid) -> Self {
        Self { pid }
    }
}

impl ProcessProvider for ProcfsProcess {
    fn current_process(&self) -> Result<Option<ProcessSnapshot>> {
        if !process_exists(self.pid) {
            return Ok(None);
        }

        let stat_path = format!("/proc/{}/stat", self.pid.0);
        let name = match fs::read_to_string(&stat_path) {
            Ok(stat) => extract_comm(&stat)?,
            // Exited between the two reads
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {stat_path}")),
        };

        let threads = list_threads(self.pid)?
            .into_iter()
            .map(|tid| ThreadEntry::open(self.pid, tid))
            .collect();

        Ok(Some(ProcessSnapshot { handle: ProcessHandle { pid: self.pid }, name, threads }))
    }
}

/// [`TimingSource`] backed by a monotonic clock and `/proc` thread stats.
#[derive(Debug)]
pub struct ProcfsTiming {
    origin: Instant,
    ticks_per_second: i64,
}

impl ProcfsTiming {
    #[must_use]
    pub fn new() -> Self {
        Self { origin: Instant::now(), ticks_per_second: clock_ticks_per_second() }
    }
}

impl Default for ProcfsTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingSource for ProcfsTiming {
    #[allow(clippy::cast_possible_truncation)] // i64 millis covers 292M years
    fn now_ms(&self) -> i64 {
        self.origin.elapsed().as_millis() as i64
    }

    fn thread_times(&self, thread: &ThreadHandle) -> Result<CpuTimes, TimingError> {
        let path = format!("/proc/{}/task/{}/stat", thread.pid.0, thread.tid.0);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TimingError::ThreadGone(thread.tid),
            _ => TimingError::Io(e),
        })?;

        let (utime, stime) = parse_thread_stat(&content)
            .map_err(|reason| TimingError::StatParseFailed { path, reason })?;

        Ok(CpuTimes {
            kernel: ticks_to_hundred_ns(stime, self.ticks_per_second),
            user: ticks_to_hundred_ns(utime, self.ticks_per_second),
        })
    }
}

/// Extract `(utime, stime)` clock ticks from a stat line.
///
/// Format: "tid (comm) state ppid ... utime stime ...". The command name may
/// contain spaces and parentheses, so fields are counted from the last `)`.
fn parse_thread_stat(content: &str) -> Result<(i64, i64), String> {
    let close = content.rfind(')').ok_or("missing command name")?;
    let fields: Vec<&str> = content[close + 1..].split_whitespace().collect();

    // fields[0] is the state (field 3), so utime (field 14) is fields[11]
    let utime = fields.get(11).ok_or("missing utime")?;
    let stime = fields.get(12).ok_or("missing stime")?;

    let utime = utime.parse::<i64>().map_err(|e| format!("bad utime '{utime}': {e}"))?;
    let stime = stime.parse::<i64>().map_err(|e| format!("bad stime '{stime}': {e}"))?;
    Ok((utime, stime))
}

fn ticks_to_hundred_ns(ticks: i64, ticks_per_second: i64) -> i64 {
    ticks * (HUNDRED_NS_PER_SEC / ticks_per_second)
}

/// `sysconf(_SC_CLK_TCK)`, cached.
fn clock_ticks_per_second() -> i64 {
    static TICKS: OnceLock<i64> = OnceLock::new();
    *TICKS.get_or_init(|| {
        let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if ticks > 0 && HUNDRED_NS_PER_SEC % i64::from(ticks) == 0 {
            i64::from(ticks)
        } else {
            warn!("Unusable _SC_CLK_TCK ({ticks}), assuming {FALLBACK_CLOCK_TICKS}");
            FALLBACK_CLOCK_TICKS
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_thread_stat() {
        let stat = "4321 (worker) S 1 4321 4321 0 -1 4194560 120 0 0 0 250 75 0 0 20 0 8 0 1000";
        assert_eq!(parse_thread_stat(stat).unwrap(), (250, 75));
    }

    #[test]
    fn test_parse_thread_stat_comm_with_spaces() {
        let stat = "77 (tokio (rt) w) R 1 77 77 0 -1 0 0 0 0 0 9 3 0 0 20 0 1 0 5";
        assert_eq!(parse_thread_stat(stat).unwrap(), (9, 3));
    }

    #[test]
    fn test_parse_thread_stat_truncated() {
        assert!(parse_thread_stat("77 (short) R 1 2").is_err());
        assert!(parse_thread_stat("no parens here").is_err());
    }

    #[test]
    fn test_ticks_conversion() {
        // 100 Hz: one tick is 10ms = 100_000 units
        assert_eq!(ticks_to_hundred_ns(3, 100), 300_000);
        assert_eq!(ticks_to_hundred_ns(3, 1000), 30_000);
    }

    #[test]
    fn test_list_threads_self_process() {
        let pid = Pid(std::process::id());
        let tids = list_threads(pid).unwrap();
        // The main thread's tid equals the pid
        assert!(tids.contains(&Tid(pid.0)));
        assert!(tids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_list_threads_invalid_pid() {
        assert!(list_threads(Pid(9_999_999)).is_err());
    }

    #[test]
    fn test_current_process_self() {
        let pid = Pid(std::process::id());
        let snapshot = ProcfsProcess::new(pid).current_process().unwrap().unwrap();
        assert_eq!(snapshot.handle.pid, pid);
        assert!(!snapshot.name.is_empty());
        assert!(snapshot.threads.iter().all(|t| t.handle.is_some()));
    }

    #[test]
    fn test_current_process_missing() {
        let snapshot = ProcfsProcess::new(Pid(9_999_999)).current_process().unwrap();
        assert!(snapshot.is_none());
    }

    #[test]
    fn test_thread_times_self() {
        let pid = Pid(std::process::id());
        let timing = ProcfsTiming::new();
        let times = timing.thread_times(&ThreadHandle { pid, tid: Tid(pid.0) }).unwrap();
        assert!(times.kernel >= 0 && times.user >= 0);
    }

    #[test]
    fn test_thread_times_gone() {
        let timing = ProcfsTiming::new();
        let handle = ThreadHandle { pid: Pid(9_999_999), tid: Tid(9_999_999) };
        assert!(matches!(timing.thread_times(&handle), Err(TimingError::ThreadGone(_))));
    }
}

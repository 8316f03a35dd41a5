//! Collaborator interfaces the monitor depends on
//!
//! The monitor never talks to the OS directly. Process enumeration, execution
//! time counters, stack capture and symbol lookup all come through the traits
//! below, so the core can be driven by the `/proc` backend in [`crate::procfs`]
//! or by test doubles with fully scripted behaviour.

use std::rc::Rc;
use std::time::Duration;

use crate::domain::{CpuTimes, Pid, SampleError, Tid, TimingError};

/// Reference to the monitored process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    pub pid: Pid,
}

/// Ownership-free reference to an OS thread.
///
/// Holding one does not keep the thread alive; any query through it may fail
/// once the thread exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadHandle {
    pub pid: Pid,
    pub tid: Tid,
}

/// One thread of a process snapshot. `handle` is `None` when the provider could
/// not open the thread at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadEntry {
    pub tid: Tid,
    pub handle: Option<ThreadHandle>,
}

impl ThreadEntry {
    /// Entry with a handle pointing at `tid` inside `pid`.
    #[must_use]
    pub fn open(pid: Pid, tid: Tid) -> Self {
        Self { tid, handle: Some(ThreadHandle { pid, tid }) }
    }
}

/// The currently monitored process and its threads, in provider order.
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub handle: ProcessHandle,
    pub name: String,
    pub threads: Vec<ThreadEntry>,
}

/// Supplies "the currently monitored process", or none.
pub trait ProcessProvider {
    /// # Errors
    /// Returns an error only when enumeration itself is impossible; a process
    /// that does not exist is `Ok(None)`.
    fn current_process(&self) -> anyhow::Result<Option<ProcessSnapshot>>;
}

/// Wall clock plus per-thread execution-time counters.
pub trait TimingSource {
    /// Current wall-clock reading in milliseconds.
    fn now_ms(&self) -> i64;

    /// Cumulative kernel/user counters of a thread, in 100ns units.
    ///
    /// # Errors
    /// Returns [`TimingError`] when the counters cannot be read this instant.
    fn thread_times(&self, thread: &ThreadHandle) -> Result<CpuTimes, TimingError>;

    /// Block for `duration`. Used for the settling pause between two readings.
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// One-shot stack capture of a single thread.
pub trait StackSampling {
    /// Capture at most `max_depth` frame addresses, innermost first.
    ///
    /// # Errors
    /// [`SampleError::TargetExited`] when the process is gone, any other
    /// variant when the stack could not be captured this instant.
    fn sample(
        &self,
        process: &ProcessHandle,
        thread: &ThreadHandle,
        max_depth: usize,
    ) -> Result<Vec<u64>, SampleError>;
}

/// A resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl ResolvedSymbol {
    /// Symbol with a function name only.
    #[must_use]
    pub fn named(function: impl Into<String>) -> Self {
        Self { function: function.into(), file: None, line: None }
    }
}

/// Address → module / symbol lookup.
pub trait SymbolProvider {
    /// Name of the module containing `addr`, empty when unknown.
    fn module_name(&self, addr: u64) -> String;

    /// Resolved symbol for `addr`. Implementations supply their own fallback
    /// name when the address cannot be resolved.
    fn resolve(&self, addr: u64) -> ResolvedSymbol;
}

/// A shared provider keeps its caches across monitor rebuilds.
impl<T: SymbolProvider + ?Sized> SymbolProvider for Rc<T> {
    fn module_name(&self, addr: u64) -> String {
        (**self).module_name(addr)
    }

    fn resolve(&self, addr: u64) -> ResolvedSymbol {
        (**self).resolve(addr)
    }
}

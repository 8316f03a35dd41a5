//! Live per-thread monitor
//!
//! [`ThreadMonitor`] owns the record collection for one target process and
//! refreshes it on demand:
//!
//! ```text
//! rebuild(process, symbols)          tick()
//!     │                                │
//!     ├─ snapshot threads (capped)     │
//!     ├─ CPU pass ◄────────────────────┤  every record, cheap
//!     ├─ [settle + CPU pass]           │
//!     ├─ sampling pass ◄───────────────┘  first N records, expensive
//!     └─ sort
//! ```
//!
//! Nothing here fails for a single thread. A thread that exited, refused a
//! counter query or could not be sampled shows its sentinel values (`-1`,
//! `"-"`) until a later pass succeeds.

pub mod config;
pub mod ordering;
pub mod record;

pub use config::MonitorConfig;
pub use ordering::{SortDirection, SortKey, ThreadOrdering};
pub use record::ThreadRecord;

use log::{debug, info};
use std::collections::BTreeSet;

use crate::classification::{FunctionClassifier, ModuleClassifier, OsFunctions, OsModules};
use crate::domain::TimingError;
use crate::profiling::{resolve_location, StackSampler};
use crate::providers::{ProcessHandle, ProcessSnapshot, StackSampling, SymbolProvider, TimingSource};

pub struct ThreadMonitor {
    config: MonitorConfig,
    timing: Box<dyn TimingSource>,
    sampling: Box<dyn StackSampling>,
    os_modules: Box<dyn ModuleClassifier>,
    os_functions: Box<dyn FunctionClassifier>,
    process: Option<ProcessHandle>,
    symbols: Option<Box<dyn SymbolProvider>>,
    records: Vec<ThreadRecord>,
    /// Indices into `records`; may go stale after a re-sort
    selected: BTreeSet<usize>,
    ordering: ThreadOrdering,
    /// Wall clock of the previous CPU pass
    last_pass_ms: i64,
}

impl ThreadMonitor {
    /// Monitor with the default Linux classifiers plus the config's extra
    /// entries. Starts with no process.
    pub fn new(
        config: MonitorConfig,
        timing: Box<dyn TimingSource>,
        sampling: Box<dyn StackSampling>,
    ) -> Self {
        let mut os_modules = OsModules::linux_defaults();
        os_modules.extend(&config.os_modules);
        let mut os_functions = OsFunctions::linux_defaults();
        os_functions.extend(&config.os_functions);

        let ordering = ThreadOrdering::by(config.sort);
        let last_pass_ms = timing.now_ms();

        Self {
            config,
            timing,
            sampling,
            os_modules: Box::new(os_modules),
            os_functions: Box::new(os_functions),
            process: None,
            symbols: None,
            records: Vec::new(),
            selected: BTreeSet::new(),
            ordering,
            last_pass_ms,
        }
    }

    /// Replace both classifiers.
    #[must_use]
    pub fn with_classifiers(
        mut self,
        os_modules: Box<dyn ModuleClassifier>,
        os_functions: Box<dyn FunctionClassifier>,
    ) -> Self {
        self.os_modules = os_modules;
        self.os_functions = os_functions;
        self
    }

    /// Start monitoring `process` from scratch, or stop monitoring with `None`.
    pub fn rebuild(
        &mut self,
        process: Option<&ProcessSnapshot>,
        symbols: Option<Box<dyn SymbolProvider>>,
    ) {
        self.selected.clear();
        self.records.clear();
        self.process = None;
        self.symbols = None;

        let Some(process) = process else {
            info!("No process to monitor");
            return;
        };

        self.process = Some(process.handle);
        self.symbols = symbols;
        if self.symbols.is_none() {
            debug!("No symbol provider for {}, locations will be unknown", process.handle.pid);
        }

        self.records = process
            .threads
            .iter()
            .take(self.config.max_displayed_threads)
            .map(ThreadRecord::new)
            .collect();

        if process.threads.len() > self.records.len() {
            info!(
                "Monitoring {} of {} threads in {} ({})",
                self.records.len(),
                process.threads.len(),
                process.handle.pid,
                process.name
            );
        } else {
            info!(
                "Monitoring {} threads in {} ({})",
                self.records.len(),
                process.handle.pid,
                process.name
            );
        }

        self.last_pass_ms = self.timing.now_ms();
        self.refresh_cpu_times();

        // A single reading cannot give a rate; take a second one so the first
        // CPU ordering means something
        if self.ordering.key() == SortKey::CpuUsage {
            self.timing.pause(self.config.settle_delay());
            self.refresh_cpu_times();
        }

        self.refresh_locations();
        self.resort();
    }

    /// Periodic refresh. Does not re-sort.
    pub fn tick(&mut self) {
        if self.records.is_empty() {
            return;
        }
        self.refresh_cpu_times();
        self.refresh_locations();
    }

    /// CPU pass over every record.
    fn refresh_cpu_times(&mut self) {
        let now = self.timing.now_ms();
        let elapsed_ms = now - self.last_pass_ms;
        self.last_pass_ms = now;

        for record in &mut self.records {
            let tid = record.tid();
            let query = record
                .handle()
                .map_err(|_| TimingError::HandleUnavailable(tid))
                .and_then(|handle| self.timing.thread_times(&handle));
            record.apply_times(query, elapsed_ms);
        }
    }

    /// Sampling pass: every record is reset, the first
    /// `max_sampled_threads` are sampled.
    fn refresh_locations(&mut self) {
        for record in &mut self.records {
            record.reset_sample();
        }

        let Some(process) = self.process else {
            return;
        };

        let symbols = self.symbols.as_deref();
        let sampler = StackSampler::new(
            self.sampling.as_ref(),
            symbols,
            self.os_modules.as_ref(),
            self.os_functions.as_ref(),
        )
        .with_limits(self.config.stack_depth, self.config.max_modules);

        for record in self.records.iter_mut().take(self.config.max_sampled_threads) {
            let Ok(handle) = record.handle() else {
                continue;
            };

            let summary = sampler.sample(&process, &handle);
            if summary.is_empty() {
                continue;
            }
            record.set_sample(resolve_location(summary.address, symbols), summary.modules_display());
        }
    }

    /// Column-header click on `key`, then re-sort.
    pub fn sort_by(&mut self, key: SortKey) {
        self.ordering.select(key);
        self.resort();
    }

    /// Re-apply the current ordering.
    pub fn resort(&mut self) {
        self.ordering.sort(&mut self.records);
    }

    /// Mark `index` as selected. Indices are not validated here.
    pub fn select(&mut self, index: usize) {
        self.selected.insert(index);
    }

    pub fn deselect(&mut self, index: usize) {
        self.selected.remove(&index);
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Every record when `all` is set, otherwise the selected ones in index
    /// order. Indices past the end of the collection are skipped.
    #[must_use]
    pub fn selected_records(&self, all: bool) -> Vec<&ThreadRecord> {
        if all {
            return self.records.iter().collect();
        }
        self.selected.iter().filter_map(|&index| self.records.get(index)).collect()
    }

    /// True while at least one index is selected.
    #[must_use]
    pub fn can_confirm_selection(&self) -> bool {
        !self.selected.is_empty()
    }

    /// True when there is anything to select.
    #[must_use]
    pub fn can_select_all(&self) -> bool {
        !self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[ThreadRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn process(&self) -> Option<ProcessHandle> {
        self.process
    }

    #[must_use]
    pub fn ordering(&self) -> ThreadOrdering {
        self.ordering
    }

    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Wall-clock reading of the last CPU pass.
    #[must_use]
    pub fn last_refresh_ms(&self) -> i64 {
        self.last_pass_ms
    }
}

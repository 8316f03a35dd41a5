//! One-shot stack sampling and frame classification
//!
//! Capturing a stack is the expensive part of a refresh, so each thread gets
//! exactly one sample per pass. From that sample we derive:
//!
//! - a **representative address**: the single program counter shown as "where
//!   this thread is", and
//! - the **module set**: the user (non runtime/OS) modules seen on the stack.
//!
//! ## Choosing the representative address
//!
//! ```text
//! frame 0  (innermost)   default choice
//! frame 1                 ← first runtime/OS module, scanning inner → outer
//! ...
//! frame N  (outermost)   ← first OS function, scanning outer → inner (wins)
//! ```
//!
//! The forward scan finds where execution entered platform code. The reverse
//! scan looks for a recognised blocking entry point and overrides the forward
//! result when one exists, even if the forward scan found a more specific inner
//! boundary. That precedence is a heuristic and kept as is because it changes
//! what users see.

use log::{debug, trace};
use std::collections::BTreeSet;

use crate::classification::{FunctionClassifier, ModuleClassifier};
use crate::domain::SampleError;
use crate::providers::{ProcessHandle, StackSampling, SymbolProvider, ThreadHandle};

/// Default bound on distinct module names kept per sample.
pub const MAX_MODULES_PER_SAMPLE: usize = 10;

/// Default depth budget passed to the sampling collaborator.
pub const DEFAULT_STACK_DEPTH: usize = 64;

/// Result of sampling one thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackSummary {
    /// Representative program counter, `0` when no location is available.
    pub address: u64,
    /// User modules that contributed frames, sorted and deduplicated.
    pub modules: BTreeSet<String>,
}

impl StackSummary {
    /// "No location available".
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// True when the sample produced nothing usable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.address == 0 && self.modules.is_empty()
    }

    /// Module names joined with `", "`, or `"-"` when there are none.
    #[must_use]
    pub fn modules_display(&self) -> String {
        if self.modules.is_empty() {
            "-".to_string()
        } else {
            self.modules.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        }
    }
}

/// Stack sampler - wraps the sampling and symbol collaborators
///
/// Borrows everything it needs so the monitor can build one per refresh pass
/// without cloning classifiers or providers.
pub struct StackSampler<'a> {
    sampling: &'a dyn StackSampling,
    symbols: Option<&'a dyn SymbolProvider>,
    os_modules: &'a dyn ModuleClassifier,
    os_functions: &'a dyn FunctionClassifier,
    max_depth: usize,
    max_modules: usize,
}

impl<'a> StackSampler<'a> {
    /// Create a sampler with the default depth and module limits
    pub fn new(
        sampling: &'a dyn StackSampling,
        symbols: Option<&'a dyn SymbolProvider>,
        os_modules: &'a dyn ModuleClassifier,
        os_functions: &'a dyn FunctionClassifier,
    ) -> Self {
        Self {
            sampling,
            symbols,
            os_modules,
            os_functions,
            max_depth: DEFAULT_STACK_DEPTH,
            max_modules: MAX_MODULES_PER_SAMPLE,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, max_depth: usize, max_modules: usize) -> Self {
        self.max_depth = max_depth;
        self.max_modules = max_modules;
        self
    }

    /// Sample `thread` once and summarise the stack.
    ///
    /// Never fails: a vanished target, an empty stack or a sampling error all
    /// yield [`StackSummary::none`] for this thread only.
    pub fn sample(&self, process: &ProcessHandle, thread: &ThreadHandle) -> StackSummary {
        let frames = match self.sampling.sample(process, thread, self.max_depth) {
            Ok(frames) => frames,
            Err(SampleError::TargetExited) => {
                debug!("Target {} exited while sampling {}", process.pid, thread.tid);
                return StackSummary::none();
            }
            Err(e) => {
                trace!("No stack sample for {}: {e}", thread.tid);
                return StackSummary::none();
            }
        };

        let Some(&innermost) = frames.first() else {
            trace!("Empty stack sample for {}", thread.tid);
            return StackSummary::none();
        };

        let mut summary = StackSummary { address: innermost, modules: BTreeSet::new() };

        // Classification needs module and symbol lookups
        let Some(symbols) = self.symbols else {
            return summary;
        };

        self.scan_modules(symbols, &frames, &mut summary);
        self.scan_os_functions(symbols, &frames, &mut summary);

        summary
    }

    /// Forward scan (inner → outer): first OS module boundary, user module set.
    fn scan_modules(
        &self,
        symbols: &dyn SymbolProvider,
        frames: &[u64],
        summary: &mut StackSummary,
    ) {
        let mut found_os_module = false;

        for &addr in frames {
            let module = symbols.module_name(addr);
            if module.is_empty() {
                continue;
            }

            if self.os_modules.is_os_module(&module) {
                if !found_os_module {
                    summary.address = addr;
                    found_os_module = true;
                }
            } else if summary.modules.len() < self.max_modules || summary.modules.contains(&module)
            {
                summary.modules.insert(module);
            }
        }
    }

    /// Reverse scan (outer → inner): the first OS function wins outright.
    fn scan_os_functions(
        &self,
        symbols: &dyn SymbolProvider,
        frames: &[u64],
        summary: &mut StackSummary,
    ) {
        if let Some(&addr) = frames
            .iter()
            .rev()
            .find(|&&addr| self.os_functions.is_os_function(&symbols.resolve(addr).function))
        {
            summary.address = addr;
        }
    }
}

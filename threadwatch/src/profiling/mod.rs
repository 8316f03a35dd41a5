//! Profiling core modules
//!
//! The per-thread measurement pieces the monitor is assembled from:
//! - CPU accounting from cumulative counters
//! - One-shot stack sampling and frame classification
//! - Address to display location resolution

pub mod cpu_accountant;
pub mod location;
pub mod stack_sampler;

// Re-export common types
pub use cpu_accountant::{account_cpu, CpuUsage};
pub use location::{resolve_location, UNKNOWN_LOCATION};
pub use stack_sampler::{StackSampler, StackSummary, DEFAULT_STACK_DEPTH, MAX_MODULES_PER_SAMPLE};

//! Linux `/proc` implementations of the collaborator traits
//!
//! - [`threads`]: thread enumeration ([`ProcfsProcess`]) and per-thread
//!   execution time counters ([`ProcfsTiming`])
//! - [`sampler`]: single-frame program counter samples ([`SyscallSampler`])

pub mod sampler;
pub mod threads;

pub use sampler::SyscallSampler;
pub use threads::{list_threads, process_exists, ProcfsProcess, ProcfsTiming};

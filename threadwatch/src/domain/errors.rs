//! Structured error types for threadwatch
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Inside the monitor these never escape a refresh pass: they are logged and
//! the affected record degrades to its sentinel values.

use super::types::{Pid, Tid};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Process {0} not found")]
    ProcessNotFound(Pid),

    #[error("Thread {0} has no usable handle")]
    HandleUnavailable(Tid),

    #[error("Symbol resolution failed: {0}")]
    SymbolizationFailed(String),

    #[error("Failed to read /proc/{0}/maps")]
    MemoryMapsParseFailed(Pid),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure to read a thread's execution-time counters.
#[derive(Error, Debug)]
pub enum TimingError {
    #[error("Thread {0} no longer exists")]
    ThreadGone(Tid),

    #[error("Thread {0} has no usable handle")]
    HandleUnavailable(Tid),

    #[error("Failed to parse {path}: {reason}")]
    StatParseFailed { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure raised by a stack sampling collaborator.
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("Target process has exited")]
    TargetExited,

    #[error("Thread {0} no longer exists")]
    ThreadGone(Tid),

    #[error("Stack sample failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write snapshot file: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiler_error_display() {
        let err = ProfilerError::ProcessNotFound(Pid(1234));
        assert_eq!(err.to_string(), "Process PID:1234 not found");
    }

    #[test]
    fn test_stat_parse_error() {
        let err = TimingError::StatParseFailed {
            path: "/proc/1/task/1/stat".to_string(),
            reason: "missing utime".to_string(),
        };
        assert!(err.to_string().contains("/proc/1/task/1/stat"));
        assert!(err.to_string().contains("missing utime"));
    }

    #[test]
    fn test_sample_error_display() {
        assert_eq!(SampleError::TargetExited.to_string(), "Target process has exited");
        assert_eq!(SampleError::ThreadGone(Tid(9)).to_string(), "Thread TID:9 no longer exists");
    }
}

//! CLI argument definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::monitor::SortKey;

#[derive(Parser)]
#[command(
    name = "threadwatch",
    about = "Live per-thread CPU usage and location of a running process",
    after_help = "\
EXAMPLES:
    threadwatch my-app                          Auto-detect PID and binary
    threadwatch --pid 1234                      Explicit PID, auto-detect binary
    threadwatch --pid 1234 --target ./myapp     Symbols from an unstripped copy
    threadwatch my-app --duration 30 --export threads.json"
)]
pub struct Args {
    /// Process name to monitor (auto-detects PID and binary)
    #[arg(value_name = "PROCESS")]
    pub process: Option<String>,

    /// Process ID to monitor
    #[arg(short, long)]
    pub pid: Option<u32>,

    /// Binary to read the executable's symbols from (defaults to /proc/<pid>/exe)
    #[arg(short, long)]
    pub target: Option<String>,

    /// JSON config file (see `MonitorConfig`)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Refresh period in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Threads kept per rebuild
    #[arg(long, value_name = "N")]
    pub max_threads: Option<usize>,

    /// Threads stack-sampled per refresh
    #[arg(long, value_name = "N")]
    pub max_sampled: Option<usize>,

    /// Initial sort column
    #[arg(short, long, value_enum)]
    pub sort: Option<SortArg>,

    /// Rows printed per refresh (0 = all)
    #[arg(long, default_value = "20")]
    pub rows: usize,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Write every refresh as JSON to FILE on exit
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Suppress the table output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Location,
    Cpu,
    Total,
    Tid,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Location => SortKey::Location,
            SortArg::Cpu => SortKey::CpuUsage,
            SortArg::Total => SortKey::TotalCpu,
            SortArg::Tid => SortKey::ThreadId,
        }
    }
}

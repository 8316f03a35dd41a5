//! # threadwatch - Live Per-Thread Monitor
//!
//! threadwatch shows, for every thread of a running process, how much CPU it
//! used since the last refresh, how much it used in total, and where it
//! currently is: the function it executes and the modules on its stack.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Target Process                             │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ /proc/<pid>/{task,maps,syscall}
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Collaborators (providers)          Linux backend (procfs,      │
//! │  ProcessProvider  TimingSource      symbolization)              │
//! │  StackSampling    SymbolProvider                                │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     ThreadMonitor (monitor)                     │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │ CPU pass     │   │ Sampling     │   │ Ordering     │         │
//! │  │ (accountant) │   │ pass         │   │ + selection  │         │
//! │  └──────────────┘   └──────┬───────┘   └──────────────┘         │
//! │                            ▼                                    │
//! │                     ┌──────────────┐                            │
//! │                     │ Classifiers  │                            │
//! │                     │ (OS modules, │                            │
//! │                     │  functions)  │                            │
//! │                     └──────────────┘                            │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         ▼
//!                 table (report) / JSON (export)
//! ```
//!
//! ## Module Structure
//!
//! - [`monitor`]: the record collection, refresh passes, ordering and selection
//! - [`profiling`]: CPU accounting, stack summarizing, location resolution
//! - [`classification`]: which modules and functions belong to the OS
//! - [`providers`]: collaborator traits the monitor is driven through
//! - [`procfs`]: `/proc` thread enumeration, time counters and sampling
//! - [`symbolization`]: module map and ELF/DWARF symbol lookup
//! - [`export`]: JSON snapshots of the collection
//! - [`report`]: the plain-text table
//! - [`cli`], [`preflight`], [`process_lookup`]: the command-line driver's pieces
//! - [`domain`]: ids, counters and error types
//!
//! ## Refresh Model
//!
//! A rebuild snapshots the thread list and takes a first CPU reading. When the
//! table is sorted by CPU usage, it pauses briefly and takes a second reading
//! so the first order is meaningful. Every tick then runs a CPU pass over all
//! records and a sampling pass over the first few. Re-sorting is left to the
//! caller.

pub mod classification;
pub mod cli;
pub mod domain;
pub mod export;
pub mod monitor;
pub mod preflight;
pub mod process_lookup;
pub mod procfs;
pub mod profiling;
pub mod providers;
pub mod report;
pub mod symbolization;

//! # Address Resolution for a Live Process
//!
//! Samples arrive as raw instruction pointers such as `0x7f3c9e2b1d4e`. The
//! monitor needs two things for each one: the name of the module it executes
//! in (to build the module set and spot OS code) and the function name (to
//! display a location and spot OS wait functions).
//!
//! ## Address Translation
//!
//! Shared libraries and PIE executables are loaded at a randomized base, while
//! their symbol tables and DWARF use file-relative addresses:
//!
//! ```text
//! /proc/<pid>/maps:  7f3c9e200000-7f3c9e3bd000 ... /usr/lib/libc.so.6
//! runtime address:   0x7f3c9e2b1d4e
//! file address:      0x7f3c9e2b1d4e - 0x7f3c9e200000 = 0xb1d4e
//! lookup:            0xb1d4e → __GI___poll
//! ```
//!
//! Fixed-address executables (`ET_EXEC`) are looked up with the runtime
//! address unchanged.
//!
//! ## Sources of Names
//!
//! - DWARF via `addr2line`/`gimli`: function, file and line, when the binary
//!   was built with debug info
//! - `.symtab`/`.dynsym` via `object`: function name only, enough for system
//!   libraries
//! - Otherwise `module+0xoffset`, or `<unknown>` outside every module
//!
//! Rust names are demangled with `rustc-demangle`.
//!
//! ## Module Structure
//!
//! - **`memory_maps`**: parses `/proc/<pid>/maps` into merged module ranges
//! - **`symbolizer`**: per-binary lookup with a result cache
//! - **`proc_symbols`**: [`ProcSymbols`], the `SymbolProvider` the monitor uses

pub mod memory_maps;
pub mod proc_symbols;
pub mod symbolizer;

pub use memory_maps::{MappedModule, MemoryRange, ModuleMap};
pub use proc_symbols::{ProcSymbols, UNKNOWN_SYMBOL};
pub use symbolizer::Symbolizer;

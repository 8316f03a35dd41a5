//! Pre-flight checks for threadwatch
//!
//! Validates access to the target before the monitor starts, with actionable
//! messages when something is missing.

use anyhow::{bail, Context, Result};
use object::{Object, ObjectSection};
use std::path::Path;

use crate::domain::Pid;

/// Check if the target process exists
pub fn check_process_exists(pid: Pid) -> Result<()> {
    let proc_path = format!("/proc/{}", pid.0);
    if !Path::new(&proc_path).exists() {
        bail!(
            "Process {} not found.\n\n\
             Is the process still running? Check with: ps -p {}",
            pid.0,
            pid.0
        );
    }
    Ok(())
}

/// Check if we can read the process's memory maps
pub fn check_proc_access(pid: Pid) -> Result<()> {
    let maps_path = format!("/proc/{}/maps", pid.0);
    std::fs::read_to_string(&maps_path).with_context(|| {
        format!(
            "Cannot read {maps_path}\n\n\
             This usually means:\n\
             - The process doesn't exist (check: ps -p {})\n\
             - Permission denied (run as the process owner or with sudo)\n\
             - /proc is not mounted",
            pid.0
        )
    })?;
    Ok(())
}

/// True when `/proc/<pid>/syscall` is readable, i.e. locations can be sampled.
///
/// The file needs ptrace access; without it every location stays unknown.
#[must_use]
pub fn can_sample_stacks(pid: Pid) -> bool {
    std::fs::read_to_string(format!("/proc/{}/syscall", pid.0)).is_ok()
}

/// Check if the target binary exists and is readable
pub fn check_binary_exists(target_path: &str) -> Result<()> {
    let path = Path::new(target_path);
    if !path.exists() {
        bail!(
            "Binary not found: {}\n\n\
             Make sure the path is correct and the binary exists.",
            target_path
        );
    }
    if !path.is_file() {
        bail!(
            "Not a file: {}\n\n\
             --target must point to an executable file, not a directory.",
            target_path
        );
    }
    Ok(())
}

/// Warn when the binary cannot produce function names or source locations
pub fn check_debug_symbols(target_path: &str, quiet: bool) -> Result<()> {
    if quiet {
        return Ok(());
    }

    let file_data = std::fs::read(target_path)
        .with_context(|| format!("Failed to read binary: {target_path}"))?;

    let Ok(obj) = object::File::parse(&*file_data) else {
        // Not a valid object file, let the symbolizer report it
        return Ok(());
    };

    let has_debug_info = obj.section_by_name(".debug_info").is_some_and(|s| s.size() > 0);
    let has_symtab = obj.section_by_name(".symtab").is_some_and(|s| s.size() > 0);

    if !has_debug_info && !has_symtab {
        eprintln!("warning: binary stripped, locations in it will show as module+offset");
    } else if !has_debug_info {
        eprintln!("warning: no DWARF debug info, source locations unavailable");
    }

    Ok(())
}

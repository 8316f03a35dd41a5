//! Locate the target process by name and resolve its executable.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::Pid;

/// A running process matched by name.
#[derive(Debug)]
pub struct ProcessMatch {
    pub pid: Pid,
    pub exe_path: PathBuf,
    pub command: String,
}

/// Find the single process whose command name or executable basename matches
/// `name`.
///
/// # Errors
/// - No processes found
/// - Multiple processes found (ambiguous)
pub fn find_process_by_name(name: &str) -> Result<ProcessMatch> {
    let own_pid = std::process::id();
    let mut matches: Vec<ProcessMatch> = Vec::new();

    for entry in fs::read_dir("/proc").context("Failed to read /proc")?.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        // Never match ourselves when the name is a substring of our own
        if pid == own_pid {
            continue;
        }

        // Kernel threads and processes we may not inspect have no readable exe
        let Ok(exe_path) = resolve_exe_path(Pid(pid)) else {
            continue;
        };
        let Ok(stat) = fs::read_to_string(format!("/proc/{pid}/stat")) else {
            continue;
        };
        let Ok(command) = extract_comm(&stat) else {
            continue;
        };

        if is_match(&command, &exe_path, name) {
            matches.push(ProcessMatch { pid: Pid(pid), exe_path, command });
        }
    }

    match matches.len() {
        0 => bail!("No process matching '{name}' found"),
        1 => Ok(matches.remove(0)),
        _ => {
            let list: Vec<String> =
                matches.iter().map(|m| format!("  {} ({})", m.pid.0, m.command)).collect();
            bail!(
                "Multiple processes match '{name}':\n{}\n\n\
                 Specify PID explicitly: threadwatch --pid <PID>",
                list.join("\n")
            )
        }
    }
}

/// Executable of a process, from `/proc/<pid>/exe`.
///
/// # Errors
/// Returns error if the process doesn't exist or the link is not readable.
pub fn resolve_exe_path(pid: Pid) -> Result<PathBuf> {
    let exe_link = format!("/proc/{}/exe", pid.0);
    fs::read_link(&exe_link).with_context(|| format!("Cannot read {exe_link}"))
}

/// Command name from a `/proc/<pid>/stat` line ("pid (comm) state ...").
///
/// # Errors
/// Returns an error when the parentheses are missing.
pub fn extract_comm(stat_line: &str) -> Result<String> {
    let open = stat_line.find('(').context("Invalid stat format")?;
    let close = stat_line.rfind(')').context("Invalid stat format")?;
    if open >= close {
        bail!("Invalid stat format");
    }
    Ok(stat_line[open + 1..close].to_string())
}

/// Exact match on command or exe basename first, then substring.
fn is_match(command: &str, exe_path: &Path, pattern: &str) -> bool {
    let exe_basename = exe_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let pattern_basename = Path::new(pattern).file_name().and_then(|n| n.to_str()).unwrap_or(pattern);

    command == pattern_basename
        || exe_basename == pattern_basename
        || command.contains(pattern)
        || exe_basename.contains(pattern)
}

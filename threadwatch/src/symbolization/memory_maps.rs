//! Memory mapping utilities for process address space analysis
//!
//! Parses `/proc/<pid>/maps` into the set of file-backed modules, so any
//! sampled address can be attributed to the binary it executes in and
//! translated into a file-relative address for symbolization.

use log::debug;
use std::collections::HashMap;
use std::fs;

use crate::domain::{Pid, ProfilerError};

/// Memory range of a loaded binary in a process's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
}

impl MemoryRange {
    /// Check if an address falls within this memory range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// One mapped binary (all of its segments merged).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedModule {
    pub path: String,
    pub range: MemoryRange,
}

impl MappedModule {
    /// File name without directories, e.g. `libc.so.6`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Address relative to the module's load base.
    #[must_use]
    pub fn relative(&self, addr: u64) -> u64 {
        addr - self.range.start
    }
}

/// All file-backed modules of a process, ordered by start address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleMap {
    modules: Vec<MappedModule>,
}

impl ModuleMap {
    /// Read and parse `/proc/<pid>/maps`.
    ///
    /// # Errors
    /// Returns [`ProfilerError::MemoryMapsParseFailed`] if the file cannot be read
    pub fn from_pid(pid: Pid) -> Result<Self, ProfilerError> {
        let maps_path = format!("/proc/{}/maps", pid.0);
        let maps = fs::read_to_string(&maps_path).map_err(|e| {
            debug!("Failed to read {maps_path}: {e}");
            ProfilerError::MemoryMapsParseFailed(pid)
        })?;
        let map = Self::parse(&maps);
        debug!("{} modules mapped in {pid}", map.modules.len());
        Ok(map)
    }

    /// Parse maps content: "start-end perms offset dev inode pathname".
    ///
    /// Anonymous mappings and pseudo entries other than the vDSO are skipped.
    /// Segments of the same file are merged from the minimum start to the
    /// maximum end. Malformed lines are ignored.
    #[must_use]
    pub fn parse(maps: &str) -> Self {
        let mut by_path: HashMap<String, MemoryRange> = HashMap::new();

        for line in maps.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                continue;
            }

            let path = parts[5..].join(" ");
            let path = path.strip_suffix(" (deleted)").unwrap_or(&path);
            if !(path.starts_with('/') || path == "[vdso]" || path == "[vsyscall]") {
                continue;
            }

            let Some((start, end)) = parts[0].split_once('-') else {
                continue;
            };
            let (Ok(start), Ok(end)) = (u64::from_str_radix(start, 16), u64::from_str_radix(end, 16))
            else {
                continue;
            };

            by_path
                .entry(path.to_string())
                .and_modify(|range| {
                    range.start = range.start.min(start);
                    range.end = range.end.max(end);
                })
                .or_insert(MemoryRange { start, end });
        }

        let mut modules: Vec<MappedModule> =
            by_path.into_iter().map(|(path, range)| MappedModule { path, range }).collect();
        modules.sort_by_key(|m| m.range.start);
        Self { modules }
    }

    /// Module containing `addr`.
    #[must_use]
    pub fn module_for(&self, addr: u64) -> Option<&MappedModule> {
        // Last module starting at or before addr
        let idx = self.modules.partition_point(|m| m.range.start <= addr);
        let module = self.modules.get(idx.checked_sub(1)?)?;
        module.range.contains(addr).then_some(module)
    }

    #[must_use]
    pub fn modules(&self) -> &[MappedModule] {
        &self.modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
55d4a1b00000-55d4a1b20000 r--p 00000000 08:01 1234 /opt/app/server
55d4a1b20000-55d4a1c00000 r-xp 00020000 08:01 1234 /opt/app/server
55d4a2000000-55d4a2100000 rw-p 00000000 00:00 0 [heap]
7f3c9e200000-7f3c9e228000 r--p 00000000 08:01 5678 /usr/lib/x86_64-linux-gnu/libc.so.6
7f3c9e228000-7f3c9e3bd000 r-xp 00028000 08:01 5678 /usr/lib/x86_64-linux-gnu/libc.so.6
7f3c9e400000-7f3c9e401000 r-xp 00000000 00:00 0
7f3c9e500000-7f3c9e501000 r-xp 00000000 08:01 9999 /tmp/my plugin.so (deleted)
7ffd2a1fe000-7ffd2a200000 r-xp 00000000 00:00 0 [vdso]
garbage line
";

    #[test]
    fn test_memory_range_contains() {
        let range = MemoryRange { start: 0x1000, end: 0x2000 };

        assert!(range.contains(0x1000));
        assert!(range.contains(0x1FFF));
        assert!(!range.contains(0x0FFF));
        assert!(!range.contains(0x2000));
    }

    #[test]
    fn test_parse_merges_segments() {
        let map = ModuleMap::parse(MAPS);
        let names: Vec<&str> = map.modules().iter().map(MappedModule::name).collect();
        assert_eq!(names, vec!["server", "libc.so.6", "my plugin.so", "[vdso]"]);

        assert_eq!(
            map.modules()[0].range,
            MemoryRange { start: 0x55d4_a1b0_0000, end: 0x55d4_a1c0_0000 }
        );
    }

    #[test]
    fn test_module_for() {
        let map = ModuleMap::parse(MAPS);
        let libc = map.module_for(0x7f3c_9e2b_1d4e).unwrap();
        assert_eq!(libc.name(), "libc.so.6");
        assert_eq!(libc.relative(0x7f3c_9e2b_1d4e), 0xb_1d4e);

        assert_eq!(map.module_for(0x7ffd_2a1f_e010).unwrap().name(), "[vdso]");
        // Heap and anonymous executable memory belong to no module
        assert!(map.module_for(0x55d4_a200_0010).is_none());
        assert!(map.module_for(0x7f3c_9e40_0010).is_none());
        assert!(map.module_for(0x10).is_none());
    }

    #[test]
    fn test_from_pid_self() {
        let map = ModuleMap::from_pid(Pid(std::process::id())).unwrap();
        let exe = std::env::current_exe().unwrap();
        let exe = exe.to_string_lossy();
        assert!(map.modules().iter().any(|m| m.path == exe), "own executable not mapped: {exe}");
    }

    #[test]
    fn test_from_pid_missing() {
        assert!(matches!(
            ModuleMap::from_pid(Pid(9_999_999)),
            Err(ProfilerError::MemoryMapsParseFailed(Pid(9_999_999)))
        ));
    }
}

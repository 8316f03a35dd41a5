//! [`SymbolProvider`] for a live process
//!
//! Module names come from the process memory map. Function names come from a
//! [`Symbolizer`] per module, loaded the first time an address in that module
//! is resolved. Modules that cannot be loaded are remembered as such and
//! resolve to `module+0xoffset`.

use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::domain::{Pid, ProfilerError};
use crate::providers::{ResolvedSymbol, SymbolProvider};

use super::memory_maps::{MappedModule, ModuleMap};
use super::symbolizer::Symbolizer;

/// Name returned for addresses outside every mapped module.
pub const UNKNOWN_SYMBOL: &str = "<unknown>";

pub struct ProcSymbols {
    pid: Pid,
    modules: ModuleMap,
    /// Files to read instead of the mapped path (e.g. an unstripped copy)
    overrides: HashMap<String, PathBuf>,
    /// Keyed by module path; `None` once loading failed
    symbolizers: RefCell<HashMap<String, Option<Symbolizer>>>,
}

impl ProcSymbols {
    /// Snapshot the memory map of `pid`.
    ///
    /// # Errors
    /// Returns [`ProfilerError::MemoryMapsParseFailed`] if the map is unreadable
    pub fn load(pid: Pid) -> Result<Self, ProfilerError> {
        let modules = ModuleMap::from_pid(pid)?;
        if modules.modules().is_empty() {
            return Err(ProfilerError::MemoryMapsParseFailed(pid));
        }
        Ok(Self::with_modules(pid, modules))
    }

    /// Provider over an already parsed map.
    #[must_use]
    pub fn with_modules(pid: Pid, modules: ModuleMap) -> Self {
        Self { pid, modules, overrides: HashMap::new(), symbolizers: RefCell::new(HashMap::new()) }
    }

    /// Read symbols for the module mapped from `mapped_path` out of `binary`.
    #[must_use]
    pub fn with_binary(mut self, mapped_path: impl Into<String>, binary: impl Into<PathBuf>) -> Self {
        self.overrides.insert(mapped_path.into(), binary.into());
        self
    }

    #[must_use]
    pub fn modules(&self) -> &ModuleMap {
        &self.modules
    }

    /// True while the process still maps the same modules at the same
    /// ranges. False once the map changed or became unreadable.
    #[must_use]
    pub fn is_current(&self) -> bool {
        ModuleMap::from_pid(self.pid).is_ok_and(|modules| modules == self.modules)
    }

    /// Module files are opened through the target's root so that processes in
    /// another mount namespace resolve against their own binaries.
    fn module_file(&self, module: &MappedModule) -> PathBuf {
        if let Some(binary) = self.overrides.get(&module.path) {
            return binary.clone();
        }
        PathBuf::from(format!("/proc/{}/root{}", self.pid.0, module.path))
    }

    fn resolve_in(&self, module: &MappedModule, addr: u64) -> Option<ResolvedSymbol> {
        // Pseudo modules like [vdso] have no file to read
        if !module.path.starts_with('/') {
            return None;
        }

        let mut symbolizers = self.symbolizers.borrow_mut();
        let symbolizer = symbolizers.entry(module.path.clone()).or_insert_with(|| {
            match Symbolizer::new(self.module_file(module)) {
                Ok(symbolizer) => Some(symbolizer),
                Err(e) => {
                    warn!("No symbols for {}: {e}", module.path);
                    None
                }
            }
        });

        let symbolizer = symbolizer.as_ref()?;
        let file_addr =
            if symbolizer.is_position_independent() { module.relative(addr) } else { addr };
        symbolizer.resolve(file_addr)
    }
}

impl SymbolProvider for ProcSymbols {
    fn module_name(&self, addr: u64) -> String {
        self.modules.module_for(addr).map(|m| m.name().to_string()).unwrap_or_default()
    }

    fn resolve(&self, addr: u64) -> ResolvedSymbol {
        let Some(module) = self.modules.module_for(addr) else {
            debug!("0x{addr:x} is outside every module of {}", self.pid);
            return ResolvedSymbol::named(UNKNOWN_SYMBOL);
        };

        self.resolve_in(module, addr).unwrap_or_else(|| {
            ResolvedSymbol::named(format!("{}+0x{:x}", module.name(), module.relative(addr)))
        })
    }
}

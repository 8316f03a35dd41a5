use addr2line::Context;
use gimli::{EndianRcSlice, RunTimeEndian};
use log::debug;
use object::{Object, ObjectKind, ObjectSection, ObjectSymbol, SymbolKind};
use rustc_demangle::demangle;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::domain::ProfilerError;
use crate::providers::ResolvedSymbol;

/// A function symbol from the ELF symbol tables.
#[derive(Debug, Clone)]
struct TableSymbol {
    address: u64,
    size: u64,
    name: String,
}

/// Resolves file-relative addresses of one binary to function names
///
/// DWARF debug info is consulted first for function, file and line. Binaries
/// without it (most system libraries) still resolve function names through
/// `.symtab`/`.dynsym`. Results are cached per address, misses included.
pub struct Symbolizer {
    ctx: Context<EndianRcSlice<RunTimeEndian>>,
    /// Sorted by address
    symbols: Vec<TableSymbol>,
    position_independent: bool,
    cache: RefCell<HashMap<u64, Option<ResolvedSymbol>>>,
}

impl Symbolizer {
    /// Create a new symbolizer for the given binary
    ///
    /// # Errors
    /// Returns [`ProfilerError::SymbolizationFailed`] if the file cannot be
    /// read or is not an object file. Missing debug info is not an error.
    pub fn new<P: AsRef<Path>>(binary_path: P) -> Result<Self, ProfilerError> {
        let path = binary_path.as_ref();
        let binary_data = fs::read(path).map_err(|e| {
            ProfilerError::SymbolizationFailed(format!("cannot read {}: {e}", path.display()))
        })?;

        let obj_file = object::File::parse(&*binary_data).map_err(|e| {
            ProfilerError::SymbolizationFailed(format!("cannot parse {}: {e}", path.display()))
        })?;

        let endian =
            if obj_file.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };

        let load_section =
            |id: gimli::SectionId| -> Result<EndianRcSlice<RunTimeEndian>, gimli::Error> {
                let data = obj_file
                    .section_by_name(id.name())
                    .and_then(|section| section.uncompressed_data().ok())
                    .unwrap_or(std::borrow::Cow::Borrowed(&[][..]));
                Ok(EndianRcSlice::new(Rc::from(&*data), endian))
            };

        let dwarf = gimli::Dwarf::load(&load_section).map_err(|e| {
            ProfilerError::SymbolizationFailed(format!("bad DWARF in {}: {e}", path.display()))
        })?;
        let ctx = Context::from_dwarf(dwarf).map_err(|e| {
            ProfilerError::SymbolizationFailed(format!("bad DWARF in {}: {e}", path.display()))
        })?;

        let mut symbols: Vec<TableSymbol> = obj_file
            .symbols()
            .chain(obj_file.dynamic_symbols())
            .filter(|sym| sym.kind() == SymbolKind::Text && sym.address() != 0)
            .filter_map(|sym| {
                let name = sym.name().ok().filter(|n| !n.is_empty())?;
                Some(TableSymbol { address: sym.address(), size: sym.size(), name: name.to_string() })
            })
            .collect();
        symbols.sort_by_key(|s| s.address);
        symbols.dedup_by_key(|s| s.address);

        let position_independent = obj_file.kind() == ObjectKind::Dynamic;
        debug!(
            "Loaded {} ({} symbols, {})",
            path.display(),
            symbols.len(),
            if position_independent { "PIE" } else { "fixed address" }
        );

        Ok(Self { ctx, symbols, position_independent, cache: RefCell::new(HashMap::new()) })
    }

    /// True for shared objects and PIE executables, whose addresses must be
    /// made relative to the load base before lookup.
    #[must_use]
    pub fn is_position_independent(&self) -> bool {
        self.position_independent
    }

    /// Resolve a file-relative address.
    ///
    /// Returns `None` when neither DWARF nor the symbol tables cover it.
    pub fn resolve(&self, addr: u64) -> Option<ResolvedSymbol> {
        if let Some(cached) = self.cache.borrow().get(&addr) {
            return cached.clone();
        }

        let resolved = self.resolve_dwarf(addr).or_else(|| self.resolve_table(addr));
        self.cache.borrow_mut().insert(addr, resolved.clone());
        resolved
    }

    /// Innermost frame with a function name (inlined callees come first).
    fn resolve_dwarf(&self, addr: u64) -> Option<ResolvedSymbol> {
        let mut frame_iter = self.ctx.find_frames(addr).skip_all_loads().ok()?;

        while let Ok(Some(frame)) = frame_iter.next() {
            let Some(function) = frame.function.and_then(|f| f.demangle().ok().map(|s| s.to_string()))
            else {
                continue;
            };
            let (file, line) = frame
                .location
                .map(|loc| (loc.file.map(std::string::ToString::to_string), loc.line))
                .unwrap_or_default();
            return Some(ResolvedSymbol { function, file, line });
        }
        None
    }

    fn resolve_table(&self, addr: u64) -> Option<ResolvedSymbol> {
        let idx = self.symbols.partition_point(|s| s.address <= addr);
        let symbol = self.symbols.get(idx.checked_sub(1)?)?;
        // Zero-sized symbols (hand-written assembly) cover up to the next one
        if symbol.size != 0 && addr >= symbol.address + symbol.size {
            return None;
        }
        Some(ResolvedSymbol::named(Self::demangle_symbol(&symbol.name)))
    }

    /// Demangle a Rust symbol name
    #[must_use]
    pub fn demangle_symbol(symbol: &str) -> String {
        format!("{:#}", demangle(symbol))
    }
}

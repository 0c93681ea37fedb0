use addr2line::Context;
use anyhow::{Context as _, Result};
use gimli::{EndianRcSlice, RunTimeEndian};
use log::info;
use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};
use rustc_demangle::demangle;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use super::memory_maps::{read_memory_range, MemoryRange};
use super::SymbolSource;
use crate::domain::Address;

/// Symbol source backed by the DWARF debug info of the profiled binary
///
/// Not `Send`: the DWARF sections are reference counted with `Rc`, so the
/// source is built on the thread that owns the profiler.
pub struct DwarfSymbolSource {
    ctx: Context<EndianRcSlice<RunTimeEndian>>,
    /// ELF text symbols sorted by address, for code without DWARF entries
    elf_symbols: Vec<ElfSymbol>,
    /// Where the binary is mapped; `None` means addresses are file offsets
    memory_range: Option<MemoryRange>,
}

struct ElfSymbol {
    address: u64,
    size: u64,
    name: String,
}

fn collect_elf_symbols(obj_file: &object::File<'_>) -> Vec<ElfSymbol> {
    let mut symbols: Vec<ElfSymbol> = obj_file
        .symbols()
        .filter(|sym| sym.kind() == SymbolKind::Text && sym.address() != 0)
        .filter_map(|sym| {
            let name = sym.name().ok()?;
            Some(ElfSymbol {
                address: sym.address(),
                size: sym.size(),
                name: format!("{:#}", demangle(name)),
            })
        })
        .collect();
    symbols.sort_by_key(|sym| sym.address);
    symbols
}

impl DwarfSymbolSource {
    /// Create a source for `binary_path`
    ///
    /// # Errors
    /// Returns an error if the binary file cannot be read or parsed, or if DWARF debug info is missing
    pub fn new<P: AsRef<Path>>(binary_path: P, memory_range: Option<MemoryRange>) -> Result<Self> {
        let binary_data = fs::read(binary_path.as_ref()).context("Failed to read binary file")?;

        let obj_file = object::File::parse(&*binary_data).context("Failed to parse object file")?;

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

        let dwarf = gimli::Dwarf::load(&load_section)?;
        let ctx = Context::from_dwarf(dwarf).context("Failed to load DWARF debug information")?;
        let elf_symbols = collect_elf_symbols(&obj_file);

        Ok(Self { ctx, elf_symbols, memory_range })
    }

    /// Create a source for `binary_path` as mapped into process `pid`
    ///
    /// # Errors
    /// Returns an error if the binary cannot be loaded or is not mapped in `pid`
    pub fn for_process(pid: u32, binary_path: &str) -> Result<Self> {
        let range = read_memory_range(Some(pid), binary_path)?;
        Self::new(binary_path, Some(range))
    }

    /// Create a source for the running executable, for in-process embedding
    ///
    /// # Errors
    /// Returns an error if the executable path or its mapping cannot be found
    pub fn current_process() -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate current executable")?;
        let exe_path = exe.to_str().context("Executable path is not UTF-8")?;
        let range = read_memory_range(None, exe_path)?;
        info!("Symbolizing against {exe_path}");
        Self::new(exe_path, Some(range))
    }

    /// Map a runtime address to a DWARF lookup address
    ///
    /// Returns `None` for addresses outside the binary (shared libraries).
    fn file_offset(&self, addr: u64) -> Option<u64> {
        match self.memory_range {
            Some(range) if range.contains(addr) => Some(addr - range.start),
            Some(_) => None,
            None => Some(addr),
        }
    }

    /// Outermost function name at `offset`, demangled
    fn function_at(&self, offset: u64) -> Option<String> {
        let mut frame_iter = self.ctx.find_frames(offset).skip_all_loads().ok()?;
        let mut name = None;
        // Inlined frames come first; keep the last one, the real function
        while let Ok(Some(frame)) = frame_iter.next() {
            if let Some(function) = frame.function.and_then(|f| f.demangle().ok().map(|s| s.to_string())) {
                name = Some(function);
            }
        }
        name
    }

    /// Enclosing ELF text symbol, used when DWARF has no entry
    fn elf_symbol_at(&self, offset: u64) -> Option<&str> {
        let idx = self.elf_symbols.partition_point(|sym| sym.address <= offset).checked_sub(1)?;
        let sym = &self.elf_symbols[idx];
        (sym.size == 0 || offset < sym.address + sym.size).then_some(sym.name.as_str())
    }

    fn name_for(&self, addr: u64) -> String {
        match self.file_offset(addr) {
            Some(offset) => match self
                .function_at(offset)
                .or_else(|| self.elf_symbol_at(offset).map(str::to_string))
            {
                Some(function) => format!("{function} [0x{addr:x}]"),
                None => format!("<unknown> [0x{addr:x}]"),
            },
            None => format!("<shared> [0x{addr:x}]"),
        }
    }
}

impl SymbolSource for DwarfSymbolSource {
    fn resolve(&self, addresses: &[Address]) -> Result<Vec<String>> {
        Ok(addresses.iter().map(|addr| self.name_for(addr.0)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_library_addresses_are_not_looked_up() {
        let exe = std::env::current_exe().unwrap();
        let range = MemoryRange { start: 0x7f00_0000_0000, end: 0x7f00_0010_0000 };
        let source = DwarfSymbolSource::new(&exe, Some(range)).unwrap();

        assert_eq!(source.file_offset(0x7f00_0005_0000), Some(0x5_0000));
        assert_eq!(source.file_offset(0x7f00_0100_0000), None);

        let names = source.resolve(&[Address(0x7f00_0100_0000)]).unwrap();
        assert_eq!(names, vec!["<shared> [0x7f0001000000]"]);
    }

    #[test]
    fn test_no_range_uses_address_as_is() {
        let exe = std::env::current_exe().unwrap();
        let source = DwarfSymbolSource::new(&exe, None).unwrap();
        assert_eq!(source.file_offset(0x1234_5678), Some(0x1234_5678));
    }

    #[test]
    fn test_elf_symbol_fallback() {
        let exe = std::env::current_exe().unwrap();
        let mut source = DwarfSymbolSource::new(&exe, None).unwrap();
        source.elf_symbols = vec![
            ElfSymbol { address: 0x100, size: 0x20, name: "alloc_a".to_string() },
            ElfSymbol { address: 0x200, size: 0, name: "alloc_b".to_string() },
        ];

        assert_eq!(source.elf_symbol_at(0x110), Some("alloc_a"));
        assert_eq!(source.elf_symbol_at(0x120), None);
        assert_eq!(source.elf_symbol_at(0x2ff), Some("alloc_b"));
        assert_eq!(source.elf_symbol_at(0x50), None);
    }

    #[test]
    fn test_one_name_per_address() {
        let exe = std::env::current_exe().unwrap();
        let source = DwarfSymbolSource::new(&exe, None).unwrap();
        let names = source.resolve(&[Address(0), Address(1), Address(2)]).unwrap();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|name| name.ends_with(']')));
    }
}

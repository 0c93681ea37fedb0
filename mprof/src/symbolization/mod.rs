//! # Symbol Resolution
//!
//! Converts the raw return addresses stored in bucket stacks into
//! human-readable names for the dump report's function table.
//!
//! ## Pieces
//!
//! - **[`SymbolSource`]**: the one external capability, `resolve(addresses) -> names`.
//!   - [`DwarfSymbolSource`]: DWARF lookup on the profiled binary (addr2line/gimli/object),
//!     adjusting PIE runtime addresses with the binary's mapping from `/proc/<pid>/maps`
//!   - [`HexSymbolSource`]: hex addresses as names, when no binary is available
//!   - any `Fn(&[Address]) -> anyhow::Result<Vec<String>>` closure, which is how tests mock it
//!
//! - **[`SymbolTable`]**: memoized address ↔ name table. Each address is
//!   resolved once; a stack with any unknown frame is resolved as one batch.
//!
//! ## Address Translation Flow
//!
//! ```text
//! 1. Stack frame from the allocation hook
//!    Raw address: 0x55f3a2b4c780
//!
//! 2. Mapping of the profiled binary (from /proc/<pid>/maps)
//!    0x55f3a2b4c000 - 0x55f3a2b5f000
//!
//! 3. Inside the mapping → file offset 0x780 → DWARF lookup
//!    Outside the mapping → shared library, no debug info
//!
//! 4. Name recorded in the table (≤ 80 bytes)
//!    "myapp::cache::insert [0x55f3a2b4c780]"
//! ```
//!
//! ## Failure Policy
//!
//! A source that fails, or answers with the wrong number of names, makes the
//! dump fail with [`crate::domain::ProfilerError::SymbolizationFailed`]. The
//! host treats that as fatal: a half-resolved table would silently mislabel
//! the report.

pub mod memory_maps;
pub mod source;
pub mod symbolizer;
pub mod table;

pub use memory_maps::{parse_memory_maps, read_memory_range, MemoryRange};
pub use source::{HexSymbolSource, SymbolSource};
pub use symbolizer::DwarfSymbolSource;
pub use table::{truncate_name, SymbolTable};

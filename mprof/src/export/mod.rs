//! Dump report export
//!
//! This module writes the binary report produced on every `dump` command and
//! reads it back for inspection and round-trip checks.
//!
//! ## Layout (all integers big-endian)
//!
//! ```text
//! u32   total_payload_length          everything after this field
//! u32   function_count
//! function_count × {
//!     u8    name_length (≤ 80)
//!     [u8]  name bytes, no terminator
//!     u64   address                   opaque function id
//! }
//! until end of payload, in bucket creation order × {
//!     u32   alloc_objects
//!     u32   alloc_bytes
//!     u32   free_objects
//!     u32   free_bytes
//!     u32   stack_depth
//!     stack_depth × u64 stack address
//! }
//! ```
//!
//! Counters are kept as `u64` in memory and written as their low 32 bits.

pub mod reader;
pub mod report;

pub use reader::{BucketRecord, FunctionEntry, Report};
pub use report::{encode_report, report_len, write_report};

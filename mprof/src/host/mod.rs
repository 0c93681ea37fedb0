//! # Standalone Host
//!
//! Runs a [`crate::profiling::Profiler`] behind two unix sockets so producers
//! in other processes can feed it.
//!
//! ```text
//! events socket ──▶ one task per connection ──┐  Inbound::Data / Closed
//!                   (StreamId, raw chunks)    │
//!                                             ├──▶ crossbeam unbounded ──▶ processing thread
//! control socket ─▶ one task per connection ──┘  Inbound::Text            (owns the Profiler)
//!                   (one command per line)
//! ```
//!
//! The tokio side only moves bytes. Decoding, aggregation and dumps all
//! happen on the processing thread, one message at a time, in arrival order.
//! The processing thread also builds the symbol source, since the DWARF
//! source cannot cross threads.

pub mod inbound;
pub mod server;

pub use inbound::{process_inbound, run_processor, Inbound};
pub use server::{build_symbol_source, serve, HostOptions};

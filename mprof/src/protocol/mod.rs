//! # Inbound Command Protocol
//!
//! Turns the raw byte stream written by the allocation hook into typed
//! commands.
//!
//! ## Layers
//!
//! ```text
//! raw bytes (arbitrary chunking)
//!     │
//!     ▼
//! FrameDecoder      u16 big-endian length prefix, buffers partial frames
//!     │
//!     ▼
//! Command::parse    "verb[ params]" → Start | Stop | Malloc | Free | Dump
//! ```
//!
//! The text control path skips the first layer: a text message is already a
//! complete payload.
//!
//! Packet constants and the producer-side encoder live in `mprof-common`.

pub mod command;
pub mod framing;

pub use command::{Command, FreeEvent, MallocEvent};
pub use framing::FrameDecoder;

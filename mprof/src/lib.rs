//! # mprof - In-Process Heap Allocation Profiler
//!
//! mprof receives a live stream of allocation and free events, each carrying
//! the call-stack that produced it, folds them into per-call-site statistics
//! and, on demand, writes those statistics plus a resolved symbol table into
//! a compact binary report for offline analysis.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Profiled Process                            │
//! │        malloc/free hook ──▶ mprof-common::encode_*              │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ u16-framed "verb params" packets
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      mprof (This Crate)                         │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Protocol   │──▶│  Profiling   │──▶│   Buckets    │         │
//! │  │ (framing +   │   │  (Profiler)  │   │ (call-sites) │         │
//! │  │  commands)   │   └──────┬───────┘   └──────────────┘         │
//! │  └──────────────┘          │ dump                               │
//! │                            ▼                                    │
//! │                    ┌──────────────┐   ┌──────────────┐          │
//! │                    │Symbolization │──▶│    Export    │          │
//! │                    │   (DWARF)    │   │ (report.bin) │          │
//! │                    └──────────────┘   └──────┬───────┘          │
//! │                                              ▼                  │
//! │                                       ┌──────────────┐          │
//! │                                       │   Analysis   │          │
//! │                                       │  (ranking)   │          │
//! │                                       └──────────────┘          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`protocol`]: length-prefixed framing and the `start`/`stop`/`malloc`/`free`/`dump` grammar
//! - [`buckets`]: stack hash, the call-site bucket table, and the live pointer map
//! - [`symbolization`]: address → name resolution
//!   - Uses DWARF debug information via the `addr2line` crate, ELF symbols as fallback
//!   - Handles PIE (Position Independent Executable) address adjustment
//! - [`profiling`]: the [`profiling::Profiler`] engine that ties the above together
//! - [`export`]: binary report writer and reader
//! - [`analysis`]: leaf-function space ranking over a parsed report
//! - [`host`]: unix-socket transport feeding a profiler on its own thread
//! - [`cli`]: command-line argument parsing
//! - [`domain`]: newtypes (`Address`, `BucketId`, `StreamId`) and error enums
//!
//! ## Embedding
//!
//! ```no_run
//! use mprof::profiling::{Profiler, ProfilerConfig};
//! use mprof::symbolization::HexSymbolSource;
//!
//! let mut profiler = Profiler::new(ProfilerConfig::default(), Box::new(HexSymbolSource));
//! profiler.handle_text(b"start")?;
//! profiler.handle_text(b"dump /tmp/heap.bin")?;
//! # Ok::<(), mprof::domain::ProfilerError>(())
//! ```

pub mod analysis;
pub mod buckets;
pub mod cli;
pub mod domain;
pub mod export;
pub mod host;
pub mod profiling;
pub mod protocol;
pub mod symbolization;

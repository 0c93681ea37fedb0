//! # Aggregation Engine
//!
//! The [`Profiler`] owns every piece of profiling state and processes one
//! command at a time.
//!
//! ## Command Routing
//!
//! ```text
//! handle_stream_data(stream, bytes) ──▶ FrameDecoder (per stream) ─┐
//!                                                                  ├─▶ Command::parse ─▶ handle_command
//! handle_text(bytes) ──────────────────────────────────────────────┘
//!
//! start / stop ─▶ ProfilingState
//! malloc       ─▶ BucketTable::find_or_create ─▶ counters + LiveAllocations   (Active only)
//! free         ─▶ LiveAllocations::lookup ─▶ counters                         (any state)
//! dump         ─▶ SymbolTable::ensure_resolved ─▶ encode_report ─▶ file
//! ```
//!
//! ## Error Policy
//!
//! Malformed and unknown commands are logged, counted in [`ProfilerStats`]
//! and dropped. An unavailable dump destination aborts that dump only.
//! Symbol resolution failure is returned to the caller, which is expected
//! to stop the host.

pub mod config;
pub mod engine;
pub mod stats;

pub use config::ProfilerConfig;
pub use engine::{Profiler, ProfilingState};
pub use stats::ProfilerStats;

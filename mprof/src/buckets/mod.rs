//! # Call-Site Buckets
//!
//! One [`Bucket`] per distinct (stack trace, requested size) pair, plus the
//! map from live pointers back to the bucket that allocated them.
//!
//! ## Storage
//!
//! ```text
//! slots (hash % N)          arena (creation order)
//! ┌─────┐                  ┌──────────┬──────────┬──────────┐
//! │  0  │──────────────────▶ Bucket#0 │ Bucket#1 │ Bucket#2 │ ...
//! │  1  │        ┌─────────▶  next ─┐ │          │          │
//! │ ... │        │         └────────┼─┴──────────┴────▲─────┘
//! │  k  │────────┘                  └─────────────────┘
//! └─────┘
//! ```
//!
//! Slots hold the head of a collision chain; chains link through arena
//! indices, never pointers. Iterating the arena yields buckets in creation
//! order, which the dump report relies on.

pub mod live;
pub mod table;

pub use live::LiveAllocations;
pub use table::{stack_hash, Bucket, BucketTable, DEFAULT_HASH_SLOTS};

//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep raw integers apart: a program-counter address,
//! an index into the bucket arena and a producer stream handle are all plain
//! numbers on the wire.

use mprof_common::MAX_STACK_DEPTH;
use std::fmt;
use std::ops::Deref;

/// Raw program-counter address captured in a stack trace
///
/// Reused as the opaque function id in dump reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<usize> for Address {
    fn from(addr: usize) -> Self {
        Address(addr as u64)
    }
}

/// Index of a bucket inside the bucket table's arena
///
/// Handles are only ever created by the table and stay valid for its whole
/// lifetime, since buckets are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketId(pub(crate) usize);

impl BucketId {
    /// Position of the bucket in creation order
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bucket#{}", self.0)
    }
}

/// Producer stream whose bytes are framed independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream#{}", self.0)
    }
}

/// Call-stack captured at allocation time, innermost frame first
///
/// Fixed capacity of [`MAX_STACK_DEPTH`] frames; anything deeper is dropped
/// on construction, so a corrupt depth can never grow the copy.
#[derive(Clone, Copy)]
pub struct StackTrace {
    frames: [Address; MAX_STACK_DEPTH],
    depth: usize,
}

impl StackTrace {
    #[must_use]
    pub fn new() -> Self {
        Self { frames: [Address(0); MAX_STACK_DEPTH], depth: 0 }
    }

    /// Copy up to [`MAX_STACK_DEPTH`] frames from `frames`
    #[must_use]
    pub fn from_slice(frames: &[Address]) -> Self {
        let mut stack = Self::new();
        for &frame in frames {
            if !stack.push(frame) {
                break;
            }
        }
        stack
    }

    /// Append a frame; returns `false` once the stack is full
    pub fn push(&mut self, frame: Address) -> bool {
        if self.depth == MAX_STACK_DEPTH {
            return false;
        }
        self.frames[self.depth] = frame;
        self.depth += 1;
        true
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Address] {
        &self.frames[..self.depth]
    }
}

impl Default for StackTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for StackTrace {
    type Target = [Address];

    fn deref(&self) -> &[Address] {
        self.as_slice()
    }
}

impl PartialEq for StackTrace {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for StackTrace {}

impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<const N: usize> From<[u64; N]> for StackTrace {
    fn from(frames: [u64; N]) -> Self {
        let mut stack = Self::new();
        for frame in frames {
            if !stack.push(Address(frame)) {
                break;
            }
        }
        stack
    }
}

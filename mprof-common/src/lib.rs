//! # Shared Wire Protocol (Allocation Hook ↔ Profiler)
//!
//! Defines the constants and packet layouts shared between the allocation hook
//! that produces events inside the profiled process and the `mprof` engine that
//! consumes them. The crate is `no_std` and never allocates, so the encoders
//! can run from inside a `malloc`/`free` hook without recursing into the
//! allocator.
//!
//! ## Packet Layout
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ u16 BE len   │ payload (len bytes)                          │
//! └──────────────┴──────────────────────────────────────────────┘
//!
//! payload = verb [ ' ' parameters ]
//!
//! malloc: usize ptr | usize size | i32 depth | depth × usize address
//! free:   usize ptr | usize size
//! dump:   filename bytes (verbatim, no terminator)
//! ```
//!
//! Parameters use the host's native byte order and pointer width: producer and
//! consumer always live on the same machine. Only the length header and the
//! dump report are big-endian.

#![no_std]

use core::fmt;
use core::mem::size_of;

// ============================================================================
// Protocol Constants
// ============================================================================

/// Size of the big-endian length prefix in front of every packet
pub const HEADER_LEN: usize = 2;

/// Maximum number of frames kept per call-site
///
/// Deeper stacks are truncated by the producer and clamped again by the
/// decoder, which never trusts the wire-supplied depth beyond this value.
pub const MAX_STACK_DEPTH: usize = 32;

/// Maximum number of name bytes written per function in a dump report
pub const MAX_FUNC_NAME_LEN: usize = 80;

/// Size of the `total_payload_length` field at the start of a dump report
pub const REPORT_HEADER_LEN: usize = 4;

/// Width of pointers and `size_t` values inside packet parameters
pub const POINTER_WIDTH: usize = size_of::<usize>();

/// Width of the stack depth field in `malloc` parameters
pub const DEPTH_WIDTH: usize = size_of::<i32>();

/// Largest payload a single packet can carry
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

pub const VERB_START: &[u8] = b"start";
pub const VERB_STOP: &[u8] = b"stop";
pub const VERB_MALLOC: &[u8] = b"malloc";
pub const VERB_FREE: &[u8] = b"free";
pub const VERB_DUMP: &[u8] = b"dump";

/// Separator between the verb and its parameters
pub const PARAM_SEPARATOR: u8 = b' ';

/// Fixed-size prefix of `malloc` parameters (pointer, size, depth)
pub const MALLOC_FIXED_LEN: usize = POINTER_WIDTH * 2 + DEPTH_WIDTH;

/// Size of `free` parameters (pointer, size)
pub const FREE_PARAMS_LEN: usize = POINTER_WIDTH * 2;

/// Number of parameter bytes a `malloc` event with `depth` frames occupies
#[must_use]
pub const fn malloc_params_len(depth: usize) -> usize {
    MALLOC_FIXED_LEN + depth * POINTER_WIDTH
}

// ============================================================================
// Encoding
// ============================================================================

/// Failure to encode a packet into the caller's buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The output buffer cannot hold the framed packet
    BufferTooSmall { needed: usize, available: usize },
    /// The payload does not fit in the 16-bit length header
    PayloadTooLarge(usize),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall { needed, available } => {
                write!(f, "packet needs {needed} bytes, buffer holds {available}")
            }
            Self::PayloadTooLarge(len) => {
                write!(f, "payload of {len} bytes exceeds the {MAX_PAYLOAD_LEN} byte frame limit")
            }
        }
    }
}

/// Cursor over a caller-provided buffer; capacity is checked once up front
struct PacketWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> PacketWriter<'a> {
    fn begin(buf: &'a mut [u8], verb: &[u8], params_len: usize) -> Result<Self, EncodeError> {
        let payload_len = if params_len == 0 { verb.len() } else { verb.len() + 1 + params_len };
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(EncodeError::PayloadTooLarge(payload_len));
        }
        let needed = HEADER_LEN + payload_len;
        if buf.len() < needed {
            return Err(EncodeError::BufferTooSmall { needed, available: buf.len() });
        }

        #[allow(clippy::cast_possible_truncation)]
        let header = (payload_len as u16).to_be_bytes();
        let mut writer = Self { buf, pos: 0 };
        writer.put(&header);
        writer.put(verb);
        if params_len > 0 {
            writer.put(&[PARAM_SEPARATOR]);
        }
        Ok(writer)
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn put_usize(&mut self, value: usize) {
        self.put(&value.to_ne_bytes());
    }

    fn finish(self) -> usize {
        self.pos
    }
}

/// Encode a `start` packet, returning the number of bytes written
///
/// # Errors
/// Returns `EncodeError::BufferTooSmall` if `buf` cannot hold the packet
pub fn encode_start(buf: &mut [u8]) -> Result<usize, EncodeError> {
    Ok(PacketWriter::begin(buf, VERB_START, 0)?.finish())
}

/// Encode a `stop` packet, returning the number of bytes written
///
/// # Errors
/// Returns `EncodeError::BufferTooSmall` if `buf` cannot hold the packet
pub fn encode_stop(buf: &mut [u8]) -> Result<usize, EncodeError> {
    Ok(PacketWriter::begin(buf, VERB_STOP, 0)?.finish())
}

/// Encode a `malloc` event
///
/// Stacks deeper than [`MAX_STACK_DEPTH`] are truncated to their innermost
/// frames.
///
/// # Errors
/// Returns `EncodeError::BufferTooSmall` if `buf` cannot hold the packet
pub fn encode_malloc(
    buf: &mut [u8],
    ptr: usize,
    size: usize,
    stack: &[usize],
) -> Result<usize, EncodeError> {
    let stack = &stack[..stack.len().min(MAX_STACK_DEPTH)];
    let mut writer = PacketWriter::begin(buf, VERB_MALLOC, malloc_params_len(stack.len()))?;
    writer.put_usize(ptr);
    writer.put_usize(size);
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    writer.put(&(stack.len() as i32).to_ne_bytes());
    for &addr in stack {
        writer.put_usize(addr);
    }
    Ok(writer.finish())
}

/// Encode a `free` event
///
/// # Errors
/// Returns `EncodeError::BufferTooSmall` if `buf` cannot hold the packet
pub fn encode_free(buf: &mut [u8], ptr: usize, size: usize) -> Result<usize, EncodeError> {
    let mut writer = PacketWriter::begin(buf, VERB_FREE, FREE_PARAMS_LEN)?;
    writer.put_usize(ptr);
    writer.put_usize(size);
    Ok(writer.finish())
}

/// Encode a `dump` request for `filename`
///
/// # Errors
/// Returns an error if `buf` is too small or the filename overflows a frame
pub fn encode_dump(buf: &mut [u8], filename: &[u8]) -> Result<usize, EncodeError> {
    let mut writer = PacketWriter::begin(buf, VERB_DUMP, filename.len())?;
    writer.put(filename);
    Ok(writer.finish())
}

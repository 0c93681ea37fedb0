//! Command grammar: `verb[ params]`

use mprof_common::{
    malloc_params_len, DEPTH_WIDTH, FREE_PARAMS_LEN, MALLOC_FIXED_LEN, MAX_STACK_DEPTH,
    PARAM_SEPARATOR, POINTER_WIDTH, VERB_DUMP, VERB_FREE, VERB_MALLOC, VERB_START, VERB_STOP,
};
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use crate::domain::{Address, CommandError, StackTrace};

/// A fully decoded inbound command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Malloc(MallocEvent),
    Free(FreeEvent),
    /// Write a report to the given path
    Dump(PathBuf),
}

/// Allocation observed by the hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MallocEvent {
    pub ptr: u64,
    pub size: u64,
    pub stack: StackTrace,
}

/// Release observed by the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeEvent {
    pub ptr: u64,
    pub size: u64,
}

impl Command {
    /// Parse one complete payload
    ///
    /// Trailing bytes after `start`/`stop` are ignored. `malloc` stack depth
    /// is clamped to [`MAX_STACK_DEPTH`] before any frame is read.
    ///
    /// # Errors
    /// Returns a `CommandError` for empty payloads, missing or short
    /// parameters, and unrecognized verbs
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        if payload.is_empty() {
            return Err(CommandError::EmptyCommand);
        }

        let (verb, params) = match payload.iter().position(|&b| b == PARAM_SEPARATOR) {
            Some(at) => (&payload[..at], Some(&payload[at + 1..])),
            None => (payload, None),
        };

        match verb {
            VERB_START => Ok(Command::Start),
            VERB_STOP => Ok(Command::Stop),
            VERB_MALLOC => parse_malloc(require(params, "malloc")?),
            VERB_FREE => parse_free(require(params, "free")?),
            VERB_DUMP => {
                let filename = require(params, "dump")?;
                if filename.is_empty() {
                    return Err(CommandError::EmptyFilename);
                }
                Ok(Command::Dump(PathBuf::from(OsStr::from_bytes(filename))))
            }
            _ => Err(CommandError::UnknownVerb(String::from_utf8_lossy(verb).into_owned())),
        }
    }

    /// Short name used in logs
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Malloc(_) => "malloc",
            Command::Free(_) => "free",
            Command::Dump(_) => "dump",
        }
    }
}

fn require<'a>(params: Option<&'a [u8]>, verb: &'static str) -> Result<&'a [u8], CommandError> {
    params.ok_or(CommandError::MissingParameters { verb })
}

fn parse_malloc(params: &[u8]) -> Result<Command, CommandError> {
    let mut reader = ParamReader::new(params, "malloc");
    reader.ensure_len(MALLOC_FIXED_LEN)?;
    let ptr = reader.read_usize();
    let size = reader.read_usize();
    let depth = clamp_depth(reader.read_i32());

    reader.ensure_len(malloc_params_len(depth))?;
    let mut stack = StackTrace::new();
    for _ in 0..depth {
        stack.push(Address(reader.read_usize()));
    }

    Ok(Command::Malloc(MallocEvent { ptr, size, stack }))
}

fn parse_free(params: &[u8]) -> Result<Command, CommandError> {
    let mut reader = ParamReader::new(params, "free");
    reader.ensure_len(FREE_PARAMS_LEN)?;
    let ptr = reader.read_usize();
    let size = reader.read_usize();
    Ok(Command::Free(FreeEvent { ptr, size }))
}

/// Negative depths carry no frames; anything above the cap is cut down
fn clamp_depth(raw: i32) -> usize {
    usize::try_from(raw).unwrap_or(0).min(MAX_STACK_DEPTH)
}

/// Sequential native-endian reader over a parameter block
///
/// Callers check `ensure_len` for the total length before reading, so the read
/// helpers only ever index inside the block.
struct ParamReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    verb: &'static str,
}

impl<'a> ParamReader<'a> {
    fn new(bytes: &'a [u8], verb: &'static str) -> Self {
        Self { bytes, pos: 0, verb }
    }

    fn ensure_len(&self, total: usize) -> Result<(), CommandError> {
        if self.bytes.len() < total {
            return Err(CommandError::TruncatedParameters {
                verb: self.verb,
                needed: total,
                available: self.bytes.len(),
            });
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn read_usize(&mut self) -> u64 {
        usize::from_ne_bytes(self.take::<{ POINTER_WIDTH }>()) as u64
    }

    fn read_i32(&mut self) -> i32 {
        i32::from_ne_bytes(self.take::<{ DEPTH_WIDTH }>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malloc_payload(ptr: usize, size: usize, depth: i32, frames: &[usize]) -> Vec<u8> {
        let mut payload = b"malloc ".to_vec();
        payload.extend(ptr.to_ne_bytes());
        payload.extend(size.to_ne_bytes());
        payload.extend(depth.to_ne_bytes());
        for frame in frames {
            payload.extend(frame.to_ne_bytes());
        }
        payload
    }

    #[test]
    fn test_parse_start_and_stop() {
        assert_eq!(Command::parse(b"start"), Ok(Command::Start));
        assert_eq!(Command::parse(b"stop"), Ok(Command::Stop));
        assert_eq!(Command::parse(b"start 1"), Ok(Command::Start));
    }

    #[test]
    fn test_parse_malloc() {
        let payload = malloc_payload(0x1000, 64, 2, &[0xAA, 0xBB]);
        let Command::Malloc(event) = Command::parse(&payload).unwrap() else {
            panic!("expected malloc");
        };
        assert_eq!(event.ptr, 0x1000);
        assert_eq!(event.size, 64);
        assert_eq!(event.stack, StackTrace::from([0xAA, 0xBB]));
    }

    #[test]
    fn test_parse_malloc_clamps_depth() {
        let frames: Vec<usize> = (1..=MAX_STACK_DEPTH).collect();
        let payload = malloc_payload(1, 8, 1_000_000, &frames);
        let Command::Malloc(event) = Command::parse(&payload).unwrap() else {
            panic!("expected malloc");
        };
        assert_eq!(event.stack.len(), MAX_STACK_DEPTH);
    }

    #[test]
    fn test_parse_malloc_negative_depth_has_no_frames() {
        let payload = malloc_payload(1, 8, -5, &[]);
        let Command::Malloc(event) = Command::parse(&payload).unwrap() else {
            panic!("expected malloc");
        };
        assert!(event.stack.is_empty());
    }

    #[test]
    fn test_parse_malloc_short_stack_is_rejected() {
        let payload = malloc_payload(1, 8, 3, &[0xAA]);
        assert_eq!(
            Command::parse(&payload),
            Err(CommandError::TruncatedParameters {
                verb: "malloc",
                needed: malloc_params_len(3),
                available: malloc_params_len(1),
            })
        );
    }

    #[test]
    fn test_parse_free() {
        let mut payload = b"free ".to_vec();
        payload.extend(0x1000usize.to_ne_bytes());
        payload.extend(64usize.to_ne_bytes());
        assert_eq!(
            Command::parse(&payload),
            Ok(Command::Free(FreeEvent { ptr: 0x1000, size: 64 }))
        );
    }

    #[test]
    fn test_parse_dump_keeps_filename_verbatim() {
        assert_eq!(
            Command::parse(b"dump /tmp/my out.bin"),
            Ok(Command::Dump(PathBuf::from("/tmp/my out.bin")))
        );
        assert_eq!(Command::parse(b"dump "), Err(CommandError::EmptyFilename));
    }

    #[test]
    fn test_missing_parameters() {
        assert_eq!(Command::parse(b""), Err(CommandError::EmptyCommand));
        for (verb, name) in [(&b"malloc"[..], "malloc"), (&b"free"[..], "free"), (&b"dump"[..], "dump")] {
            assert_eq!(
                Command::parse(verb),
                Err(CommandError::MissingParameters { verb: name })
            );
        }
    }

    #[test]
    fn test_unknown_and_prefix_verbs() {
        assert_eq!(
            Command::parse(b"flush now"),
            Err(CommandError::UnknownVerb("flush".to_string()))
        );
        // Verbs match exactly, not by prefix
        assert_eq!(Command::parse(b"sta"), Err(CommandError::UnknownVerb("sta".to_string())));
    }
}

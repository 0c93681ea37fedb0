//! Structured error types for mprof
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

/// A command payload that could not be turned into a [`crate::protocol::Command`]
///
/// Always recoverable: the command is logged and dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    EmptyCommand,

    #[error("{verb} param error: missing parameters")]
    MissingParameters { verb: &'static str },

    #[error("{verb} param error: needs {needed} parameter bytes, got {available}")]
    TruncatedParameters { verb: &'static str, needed: usize, available: usize },

    #[error("dump param error: empty filename")]
    EmptyFilename,

    #[error("unknown msg: {0}")]
    UnknownVerb(String),
}

#[derive(Error, Debug)]
pub enum ProfilerError {
    /// The symbol source returned nothing usable; fatal to the process
    #[error("Symbol resolution failed: {0}")]
    SymbolizationFailed(String),

    #[error("open dump file failed, {}: {source}", path.display())]
    DumpFileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProfilerError {
    /// Whether the error must terminate the host rather than drop one command
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SymbolizationFailed(_))
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("report truncated at offset {offset}: need {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    #[error("report declares {declared} payload bytes but carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

use std::fmt;

/// Counters kept by the engine for diagnostics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProfilerStats {
    /// Commands that parsed and were dispatched
    pub commands: u64,
    /// Payloads dropped for bad or missing parameters
    pub malformed: u64,
    /// Payloads dropped for an unrecognized verb
    pub unknown: u64,
    /// Allocations recorded into a bucket
    pub records: u64,
    /// Allocations seen while inactive
    pub ignored_mallocs: u64,
    /// Frees of pointers with no live entry
    pub unmatched_frees: u64,
    pub dumps_written: u64,
}

impl fmt::Display for ProfilerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "commands={} malformed={} unknown={} records={} ignored_mallocs={} unmatched_frees={} dumps={}",
            self.commands,
            self.malformed,
            self.unknown,
            self.records,
            self.ignored_mallocs,
            self.unmatched_frees,
            self.dumps_written
        )
    }
}

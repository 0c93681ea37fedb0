use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use super::{ProfilerConfig, ProfilerStats};
use crate::buckets::{BucketTable, LiveAllocations};
use crate::domain::{CommandError, ProfilerError, StreamId};
use crate::export::{encode_report, write_report};
use crate::protocol::{Command, FrameDecoder, FreeEvent, MallocEvent};
use crate::symbolization::{SymbolSource, SymbolTable};

/// Whether allocations are currently being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfilingState {
    #[default]
    Inactive,
    Active,
}

/// Heap profiling engine
///
/// Owns the bucket table, the live allocation map and the symbol table.
/// Not shared between threads: the host feeds it from a single processing
/// loop.
pub struct Profiler {
    state: ProfilingState,
    decoders: HashMap<StreamId, FrameDecoder>,
    buckets: BucketTable,
    live: LiveAllocations,
    symbols: SymbolTable,
    source: Box<dyn SymbolSource>,
    stats: ProfilerStats,
}

impl Profiler {
    #[must_use]
    pub fn new(config: ProfilerConfig, source: Box<dyn SymbolSource>) -> Self {
        let state =
            if config.start_active { ProfilingState::Active } else { ProfilingState::Inactive };
        Self {
            state,
            decoders: HashMap::new(),
            buckets: BucketTable::with_slots(config.hash_slots),
            live: LiveAllocations::new(),
            symbols: SymbolTable::new(),
            source,
            stats: ProfilerStats::default(),
        }
    }

    /// Feed raw bytes received on `stream`
    ///
    /// Every frame completed by `bytes` is dispatched in order; a trailing
    /// partial frame stays buffered for the next delivery on the same stream.
    ///
    /// # Errors
    /// Returns a fatal `ProfilerError` if a dump fails to resolve symbols.
    /// Frames after the failing one are not processed.
    pub fn handle_stream_data(&mut self, stream: StreamId, bytes: &[u8]) -> Result<(), ProfilerError> {
        let frames = self
            .decoders
            .entry(stream)
            .or_insert_with(|| {
                debug!("{stream} opened");
                FrameDecoder::new()
            })
            .feed(bytes);

        for frame in frames {
            self.handle_text(&frame)?;
        }
        Ok(())
    }

    /// Forget a stream's buffered bytes once its producer has gone away
    pub fn close_stream(&mut self, stream: StreamId) {
        match self.decoders.remove(&stream) {
            Some(decoder) if decoder.pending() > 0 => {
                warn!("{stream} closed with {} bytes of incomplete frame", decoder.pending());
            }
            Some(_) => debug!("{stream} closed"),
            None => {}
        }
    }

    /// Handle one complete, unframed command payload
    ///
    /// # Errors
    /// Returns a fatal `ProfilerError` if a dump fails to resolve symbols
    pub fn handle_text(&mut self, payload: &[u8]) -> Result<(), ProfilerError> {
        match Command::parse(payload) {
            Ok(command) => self.handle_command(command),
            Err(e) => {
                if matches!(e, CommandError::UnknownVerb(_)) {
                    self.stats.unknown += 1;
                } else {
                    self.stats.malformed += 1;
                }
                warn!("{e}");
                Ok(())
            }
        }
    }

    /// Apply a decoded command
    ///
    /// # Errors
    /// Returns a fatal `ProfilerError` if a dump fails to resolve symbols
    pub fn handle_command(&mut self, command: Command) -> Result<(), ProfilerError> {
        self.stats.commands += 1;
        match command {
            Command::Start => {
                self.state = ProfilingState::Active;
                info!("mem profiling started");
            }
            Command::Stop => {
                self.state = ProfilingState::Inactive;
                info!("mem profiling stopped");
            }
            Command::Malloc(event) => self.record_malloc(&event),
            Command::Free(event) => self.record_free(event),
            Command::Dump(path) => match self.dump(&path) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    error!("{e}");
                    return Err(e);
                }
                Err(e) => warn!("{e}"),
            },
        }
        Ok(())
    }

    fn record_malloc(&mut self, event: &MallocEvent) {
        if self.state == ProfilingState::Inactive {
            self.stats.ignored_mallocs += 1;
            return;
        }
        let id = self.buckets.find_or_create(&event.stack, event.size);
        self.buckets.get_mut(id).record_alloc(event.size);
        self.live.record(event.ptr, id);
        self.stats.records += 1;
    }

    fn record_free(&mut self, event: FreeEvent) {
        match self.live.lookup(event.ptr) {
            Some(id) => self.buckets.get_mut(id).record_free(event.size),
            None => self.stats.unmatched_frees += 1,
        }
    }

    /// Write the report for everything recorded so far to `path`
    ///
    /// Does nothing when no allocation has been recorded. Symbols for every
    /// bucket stack are resolved before the destination is opened.
    ///
    /// # Errors
    /// - `SymbolizationFailed` if the symbol source fails (fatal)
    /// - `DumpFileUnavailable` if `path` cannot be created or truncated
    /// - `Io` if writing the report fails
    pub fn dump(&mut self, path: &Path) -> Result<(), ProfilerError> {
        if self.buckets.is_empty() {
            info!("no mem records");
            return Ok(());
        }

        for bucket in self.buckets.iter() {
            self.symbols.ensure_resolved(&bucket.stack, self.source.as_ref())?;
        }

        let file = File::create(path).map_err(|source| ProfilerError::DumpFileUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let report = encode_report(&self.buckets, &self.symbols);
        write_report(file, &report)?;

        self.stats.dumps_written += 1;
        info!(
            "saved {} records, {} buckets, {} functions to {}",
            self.stats.records,
            self.buckets.len(),
            self.symbols.len(),
            path.display()
        );
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> ProfilingState {
        self.state
    }

    #[must_use]
    pub fn stats(&self) -> ProfilerStats {
        self.stats
    }

    #[must_use]
    pub fn buckets(&self) -> &BucketTable {
        &self.buckets
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    #[must_use]
    pub fn live_allocations(&self) -> &LiveAllocations {
        &self.live
    }
}

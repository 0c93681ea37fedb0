use crossbeam_channel::Receiver;
use log::info;

use crate::domain::{ProfilerError, StreamId};
use crate::profiling::{Profiler, ProfilerStats};

/// A message handed from the transport to the processing thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Raw bytes read from an event connection
    Data(StreamId, Vec<u8>),
    /// The event connection reached end of stream
    Closed(StreamId),
    /// One unframed command from the control socket
    Text(Vec<u8>),
}

/// Route one inbound message into the profiler
///
/// # Errors
/// Returns the profiler's fatal error, if any
pub fn process_inbound(profiler: &mut Profiler, message: Inbound) -> Result<(), ProfilerError> {
    match message {
        Inbound::Data(stream, bytes) => profiler.handle_stream_data(stream, &bytes),
        Inbound::Closed(stream) => {
            profiler.close_stream(stream);
            Ok(())
        }
        Inbound::Text(bytes) => profiler.handle_text(&bytes),
    }
}

/// Drain `rx` into `profiler` until every sender is gone
///
/// # Errors
/// Stops at the first fatal error and returns it; queued messages after it
/// are left unprocessed
pub fn run_processor(
    rx: &Receiver<Inbound>,
    mut profiler: Profiler,
) -> Result<ProfilerStats, ProfilerError> {
    for message in rx {
        process_inbound(&mut profiler, message)?;
    }
    info!("inbound queue closed: {}", profiler.stats());
    Ok(profiler.stats())
}

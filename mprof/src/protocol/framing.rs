//! Length-prefixed framing of the event stream

use mprof_common::HEADER_LEN;

/// Reassembles length-prefixed packets from an append-only byte stream
///
/// Bytes may arrive split at any boundary; partial headers and payloads stay
/// buffered until the rest of the frame is fed.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// Offset of the first unconsumed byte in `buf`
    start: usize,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete payload, if one is fully buffered
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let pending = &self.buf[self.start..];
        if pending.len() < HEADER_LEN {
            return None;
        }

        let payload_len = usize::from(u16::from_be_bytes([pending[0], pending[1]]));
        if pending.len() < HEADER_LEN + payload_len {
            return None;
        }

        let payload = pending[HEADER_LEN..HEADER_LEN + payload_len].to_vec();
        self.start += HEADER_LEN + payload_len;
        Some(payload)
    }

    /// Append `bytes` and return every payload completed by them, in order
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.push(bytes);
        std::iter::from_fn(|| self.next_frame()).collect()
    }

    /// Number of buffered bytes not yet part of a complete frame
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len() - self.start
    }
}

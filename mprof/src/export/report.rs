use mprof_common::REPORT_HEADER_LEN;
use std::io::Write;

use crate::buckets::BucketTable;
use crate::symbolization::SymbolTable;

/// Bytes of one bucket record before its stack
const BUCKET_FIXED_LEN: usize = 5 * 4;

/// Exact size of the encoded report, header included
#[must_use]
pub fn report_len(buckets: &BucketTable, symbols: &SymbolTable) -> usize {
    let functions: usize = symbols.iter().map(|(_, name)| 1 + name.len() + 8).sum();
    let samples: usize = buckets.iter().map(|b| BUCKET_FIXED_LEN + b.stack.len() * 8).sum();
    REPORT_HEADER_LEN + 4 + functions + samples
}

/// Low 32 bits of a counter, as stored in the report
#[allow(clippy::cast_possible_truncation)]
fn wire_u32(value: u64) -> u32 {
    value as u32
}

/// Serialize buckets and symbols into a report buffer
///
/// Sizes are computed first so the buffer is allocated once and filled in a
/// single pass. The function table follows the symbol table's resolution
/// order and buckets follow creation order, so identical event sequences
/// produce identical bytes.
#[must_use]
pub fn encode_report(buckets: &BucketTable, symbols: &SymbolTable) -> Vec<u8> {
    let total = report_len(buckets, symbols);
    let mut buf = Vec::with_capacity(total);

    #[allow(clippy::cast_possible_truncation)]
    buf.extend_from_slice(&((total - REPORT_HEADER_LEN) as u32).to_be_bytes());

    #[allow(clippy::cast_possible_truncation)]
    buf.extend_from_slice(&(symbols.len() as u32).to_be_bytes());
    for (addr, name) in symbols.iter() {
        // Names are already capped at MAX_FUNC_NAME_LEN by the symbol table
        #[allow(clippy::cast_possible_truncation)]
        buf.push(name.len() as u8);
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(&addr.0.to_be_bytes());
    }

    for bucket in buckets.iter() {
        for counter in [
            bucket.alloc_objects,
            bucket.alloc_bytes,
            bucket.free_objects,
            bucket.free_bytes,
            bucket.stack.len() as u64,
        ] {
            buf.extend_from_slice(&wire_u32(counter).to_be_bytes());
        }
        for frame in bucket.stack.iter() {
            buf.extend_from_slice(&frame.0.to_be_bytes());
        }
    }

    debug_assert_eq!(buf.len(), total);
    buf
}

/// Write a complete report to `writer`
///
/// Short writes and interrupted calls are retried until every byte is
/// accepted.
///
/// # Errors
/// Returns an error if the writer fails or stops accepting bytes
pub fn write_report<W: Write>(mut writer: W, report: &[u8]) -> std::io::Result<()> {
    writer.write_all(report)?;
    writer.flush()
}

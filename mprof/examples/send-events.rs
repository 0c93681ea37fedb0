//! Synthetic allocation producer for trying out `mprof serve`
//!
//! Streams framed events exactly as an allocation hook would, using the
//! `mprof-common` encoders, then asks for a dump.
//!
//! ## Usage
//!
//! ```bash
//! # Terminal 1: run the host
//! RUST_LOG=info cargo run --release -- serve --events /tmp/mprof.sock --control /tmp/mprof.ctl
//!
//! # Terminal 2: send events and request a report
//! cargo run --release --example send-events -- /tmp/mprof.sock /tmp/heap.bin
//!
//! # Inspect the result
//! cargo run --release -- inspect /tmp/heap.bin --inuse
//! ```

use anyhow::{anyhow, Context, Result};
use mprof_common::{encode_dump, encode_free, encode_malloc, encode_start, encode_stop, EncodeError};
use std::io::Write;
use std::os::unix::net::UnixStream;

/// Fake call-sites: (innermost-first stack, allocation size)
const CALL_SITES: [(&[usize], usize); 3] = [
    (&[0x4010, 0x4200, 0x4400], 64),
    (&[0x5010, 0x4200, 0x4400], 4096),
    (&[0x6010, 0x4400], 24),
];

fn send(
    stream: &mut UnixStream,
    buf: &mut [u8],
    encode: impl FnOnce(&mut [u8]) -> Result<usize, EncodeError>,
) -> Result<()> {
    let len = encode(buf).map_err(|e| anyhow!("encode failed: {e}"))?;
    stream.write_all(&buf[..len]).context("Failed to write event")
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let socket = args.next().unwrap_or_else(|| "/tmp/mprof.sock".to_string());
    let report = args.next().unwrap_or_else(|| "/tmp/heap.bin".to_string());

    let mut stream =
        UnixStream::connect(&socket).with_context(|| format!("Failed to connect to {socket}"))?;
    let mut buf = [0u8; 1024];

    send(&mut stream, &mut buf, encode_start)?;

    let mut next_ptr = 0x10_0000usize;
    let mut live = Vec::new();
    for round in 0..100 {
        for &(stack, size) in &CALL_SITES {
            send(&mut stream, &mut buf, |b| encode_malloc(b, next_ptr, size, stack))?;
            live.push((next_ptr, size));
            next_ptr += size;
        }
        // Free two of every three allocations, leaving the rest in use
        if round % 3 != 0 {
            for (ptr, size) in live.drain(..) {
                send(&mut stream, &mut buf, |b| encode_free(b, ptr, size))?;
            }
        }
    }

    send(&mut stream, &mut buf, encode_stop)?;
    send(&mut stream, &mut buf, |b| encode_dump(b, report.as_bytes()))?;
    println!("sent events, report requested at {report}");
    Ok(())
}

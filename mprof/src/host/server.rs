use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Sender};
use log::{debug, error, info, warn};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::oneshot;

use super::inbound::{run_processor, Inbound};
use crate::domain::StreamId;
use crate::profiling::{Profiler, ProfilerConfig};
use crate::symbolization::{read_memory_range, DwarfSymbolSource, HexSymbolSource, SymbolSource};

/// Bytes requested per read on an event connection
const READ_CHUNK: usize = 64 * 1024;

/// Everything `serve` needs to run
#[derive(Debug, Clone)]
pub struct HostOptions {
    pub events_socket: PathBuf,
    pub control_socket: PathBuf,
    /// Binary whose DWARF info names functions; hex names when absent
    pub target: Option<String>,
    /// Process the target is running as, for PIE address adjustment
    pub pid: Option<u32>,
    pub profiler: ProfilerConfig,
}

/// Pick the symbol source for the profiled program
///
/// # Errors
/// Returns an error if `target` is given but cannot be loaded
pub fn build_symbol_source(target: Option<&str>, pid: Option<u32>) -> Result<Box<dyn SymbolSource>> {
    let Some(target) = target else {
        info!("No target binary given, functions are named by address");
        return Ok(Box::new(HexSymbolSource));
    };

    let memory_range = match pid {
        Some(pid) => match read_memory_range(Some(pid), target) {
            Ok(range) => {
                info!("Found memory range: 0x{:x} - 0x{:x}", range.start, range.end);
                Some(range)
            }
            Err(e) => {
                warn!("Failed to get memory range: {e}. Symbol resolution may not work.");
                None
            }
        },
        None => None,
    };

    let source = DwarfSymbolSource::new(target, memory_range)
        .with_context(|| format!("Failed to create symbolizer for {target}"))?;
    Ok(Box::new(source))
}

/// Removes a socket file when the host shuts down
struct SocketGuard(PathBuf);

impl SocketGuard {
    fn bind(path: &Path) -> Result<(UnixListener, Self)> {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove stale socket {}", path.display()))?;
        }
        let listener = UnixListener::bind(path)
            .with_context(|| format!("Failed to bind {}", path.display()))?;
        Ok((listener, Self(path.to_path_buf())))
    }
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        std::fs::remove_file(&self.0).ok();
    }
}

/// Run the host until `shutdown` completes or the profiler hits a fatal error
///
/// # Errors
/// Returns an error if a socket cannot be bound, the symbol source cannot be
/// built, or the profiler reports a fatal error
pub async fn serve<F>(options: HostOptions, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let (events, _events_guard) = SocketGuard::bind(&options.events_socket)?;
    let (control, _control_guard) = SocketGuard::bind(&options.control_socket)?;

    info!(
        "listening: events={} control={}",
        options.events_socket.display(),
        options.control_socket.display()
    );

    let (tx, rx) = unbounded();
    let (done_tx, done_rx) = oneshot::channel();
    let HostOptions { target, pid, profiler: config, .. } = options;

    std::thread::Builder::new()
        .name("mprof-processor".to_string())
        .spawn(move || {
            let result = build_symbol_source(target.as_deref(), pid).and_then(|source| {
                run_processor(&rx, Profiler::new(config, source)).map_err(anyhow::Error::from)
            });
            done_tx.send(result).ok();
        })
        .context("Failed to spawn processing thread")?;

    let events_task = tokio::spawn(accept_events(events, tx.clone()));
    let control_task = tokio::spawn(accept_control(control, tx));

    let outcome = tokio::select! {
        result = done_rx => match result {
            Ok(Ok(stats)) => {
                info!("processing finished: {stats}");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("{e:#}");
                Err(e)
            }
            Err(_) => Err(anyhow!("processing thread exited unexpectedly")),
        },
        () = shutdown => {
            info!("shutting down");
            Ok(())
        }
    };

    events_task.abort();
    control_task.abort();
    outcome
}

async fn accept_events(listener: UnixListener, tx: Sender<Inbound>) {
    let mut next_id = 0u64;
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(e) => {
                warn!("accept on event socket failed: {e}");
                continue;
            }
        };
        let id = StreamId(next_id);
        next_id += 1;
        debug!("{id} connected");

        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = forward_events(stream, id, &tx).await {
                warn!("{id} read failed: {e}");
            }
            tx.send(Inbound::Closed(id)).ok();
        });
    }
}

/// Forward raw chunks until EOF; framing is left to the profiler
async fn forward_events(mut stream: UnixStream, id: StreamId, tx: &Sender<Inbound>) -> std::io::Result<()> {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        if tx.send(Inbound::Data(id, buf[..n].to_vec())).is_err() {
            return Ok(());
        }
    }
}

async fn accept_control(listener: UnixListener, tx: Sender<Inbound>) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(e) => {
                warn!("accept on control socket failed: {e}");
                continue;
            }
        };
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = forward_lines(stream, &tx).await {
                warn!("control connection failed: {e}");
            }
        });
    }
}

/// One command per line; a final line without a newline still counts
async fn forward_lines(stream: UnixStream, tx: &Sender<Inbound>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        if tx.send(Inbound::Text(strip_line_ending(&line).to_vec())).is_err() {
            return Ok(());
        }
    }
}

/// Drop a trailing `\n` or `\r\n`
fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_no_target_uses_hex_names() {
        let source = build_symbol_source(None, None).unwrap();
        assert_eq!(source.resolve(&[crate::domain::Address(0x10)]).unwrap(), vec!["0x10"]);
    }

    #[test]
    fn test_missing_target_is_an_error() {
        assert!(build_symbol_source(Some("/nonexistent/binary"), None).is_err());
    }

    #[test]
    fn test_control_lines_accept_crlf() {
        assert_eq!(strip_line_ending(b"stop\r\n"), b"stop");
        assert_eq!(strip_line_ending(b"stop\n"), b"stop");
        assert_eq!(strip_line_ending(b"stop"), b"stop");
        assert_eq!(strip_line_ending(b"dump /tmp/a b\r\n"), b"dump /tmp/a b");
    }

    #[test]
    fn test_control_socket_forwards_crlf_lines() {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let received = runtime.block_on(async {
            let (client, server) = UnixStream::pair().unwrap();
            let (tx, rx) = unbounded();
            let writer = async move {
                let mut client = client;
                client.write_all(b"start\r\nstop\r\n").await.unwrap();
            };
            let (forwarded, ()) = tokio::join!(forward_lines(server, &tx), writer);
            forwarded.unwrap();
            drop(tx);
            rx.iter().collect::<Vec<_>>()
        });
        let lines: Vec<Vec<u8>> = received
            .into_iter()
            .map(|msg| match msg {
                Inbound::Text(line) => line,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(lines, vec![b"start".to_vec(), b"stop".to_vec()]);
    }

    #[test]
    fn test_socket_guard_replaces_stale_file_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.sock");
        std::fs::write(&path, b"stale").unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let (_listener, guard) = SocketGuard::bind(&path).unwrap();
            assert!(path.exists());
            drop(guard);
        });
        assert!(!path.exists());
    }
}

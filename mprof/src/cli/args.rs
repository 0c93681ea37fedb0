//! CLI argument definitions

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::buckets::DEFAULT_HASH_SLOTS;
use crate::host::HostOptions;
use crate::profiling::ProfilerConfig;

#[derive(Parser)]
#[command(
    name = "mprof",
    about = "Aggregate heap allocation events into call-site reports",
    after_help = "\
EXAMPLES:
    mprof serve --events /tmp/mprof.sock --control /tmp/mprof.ctl
    mprof serve --events /tmp/mprof.sock --control /tmp/mprof.ctl --pid 1234 --target ./myapp
    echo 'dump /tmp/heap.bin' | nc -U /tmp/mprof.ctl
    mprof inspect /tmp/heap.bin --inuse --top 20
    mprof inspect /tmp/heap.bin --info /tmp/heap.txt"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Receive allocation events and write reports on `dump`
    Serve(ServeArgs),
    /// Print the space ranking of a dump report
    Inspect(InspectArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Unix socket the allocation hook streams framed events to
    #[arg(long, value_name = "SOCKET")]
    pub events: PathBuf,

    /// Unix socket accepting one text command per line
    #[arg(long, value_name = "SOCKET")]
    pub control: PathBuf,

    /// Path to binary for symbol resolution (hex addresses if omitted)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Process ID running the target, for PIE address adjustment
    #[arg(short, long, requires = "target")]
    pub pid: Option<u32>,

    /// Number of hash slots in the bucket table
    #[arg(long, default_value_t = DEFAULT_HASH_SLOTS, value_parser = parse_hash_slots)]
    pub hash_slots: usize,

    /// Record allocations immediately instead of waiting for `start`
    #[arg(long)]
    pub start_active: bool,
}

impl ServeArgs {
    /// Resolve the arguments into host options
    ///
    /// # Errors
    /// Returns an error if `--target` does not name an existing file
    pub fn host_options(&self) -> Result<HostOptions> {
        // /proc/<pid>/maps lists absolute paths
        let target = self
            .target
            .as_ref()
            .map(|t| {
                std::fs::canonicalize(t)
                    .with_context(|| format!("Failed to resolve path: {t}"))
                    .map(|p| p.to_string_lossy().into_owned())
            })
            .transpose()?;

        Ok(HostOptions {
            events_socket: self.events.clone(),
            control_socket: self.control.clone(),
            target,
            pid: self.pid,
            profiler: ProfilerConfig { hash_slots: self.hash_slots, start_active: self.start_active },
        })
    }
}

fn parse_hash_slots(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[derive(clap::Args)]
pub struct InspectArgs {
    /// Report written by a `dump` command
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// Rank by bytes still in use instead of total allocated
    #[arg(long)]
    pub inuse: bool,

    /// Show only the first N functions
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Also write every function and bucket to FILE
    #[arg(long, value_name = "FILE")]
    pub info: Option<PathBuf>,
}

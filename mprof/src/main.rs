//! # mprof - Main Entry Point
//!
//! - **serve**: run the profiler behind an event socket and a control socket
//! - **inspect**: rank the functions of a dump report, optionally writing
//!   the full function and bucket listing to a file

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::tty::IsTty;
use log::info;

use mprof::analysis::{format_details, format_ranking, rank_leaf_functions, RankMode};
use mprof::cli::{Args, Commands, InspectArgs, ServeArgs};
use mprof::export::Report;
use mprof::host::serve;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let denied = err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::PermissionDenied)
    });
    if denied {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Commands::Serve(serve_args) => run_serve(&serve_args),
        Commands::Inspect(inspect_args) => run_inspect(&inspect_args),
    }
}

#[tokio::main]
async fn run_serve(args: &ServeArgs) -> Result<()> {
    let options = args.host_options()?;
    info!("mprof v{}", env!("CARGO_PKG_VERSION"));

    serve(options, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let report = Report::from_file(&args.report)
        .with_context(|| format!("Failed to read report {}", args.report.display()))?;
    let mode = if args.inuse { RankMode::InUse } else { RankMode::Alloc };
    let mut ranks = rank_leaf_functions(&report, mode);

    if let Some(info_path) = &args.info {
        std::fs::write(info_path, format_details(&report))
            .with_context(|| format!("Failed to write {}", info_path.display()))?;
        info!("wrote report details to {}", info_path.display());
    }

    if args.json {
        if let Some(top) = args.top {
            ranks.truncate(top);
        }
        let output = serde_json::json!({
            "mode": mode,
            "functions": report.functions.len(),
            "buckets": report.buckets.len(),
            "ranking": ranks,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "{}: {} functions, {} buckets",
            args.report.display(),
            report.functions.len(),
            report.buckets.len()
        );
        let highlight = std::io::stdout().is_tty();
        print!("{}", format_ranking(&ranks, mode, args.top, highlight));
    }
    Ok(())
}

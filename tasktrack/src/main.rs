//! # tasktrack - Main Entry Point
//!
//! Runs the synthetic message-loop workload with tracking on, then prints the
//! report for `--query` (or writes it to `--output`).

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use tasktrack::cli::Args;
use tasktrack::report::{render_query, save_report};
use tasktrack::tracking::{AutoTracking, TrackingService, TRACKING_COMPILED_IN};
use tasktrack::workload;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

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
    let msg = format!("{err:#}").to_lowercase();
    if msg.contains("loop thread is required") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;
    let service = TrackingService::global();

    if !quiet {
        println!("tasktrack v{}", env!("CARGO_PKG_VERSION"));
        if !TRACKING_COMPILED_IN {
            println!("tracking: compiled out, the report will be empty");
        }
    }

    let tracking = AutoTracking::new();
    service.initialize_thread_context("MainThread");

    let config = args.workload();
    let summary = workload::run(service, &config).context("Workload failed")?;
    if !quiet {
        println!("workload: {summary}");
    }

    let report = render_query(service, &args.query);
    drop(tracking);

    match args.output {
        Some(ref path) => {
            save_report(path, &report)?;
            if !quiet {
                println!("report: {}", path.display());
            }
        }
        None => print!("{report}"),
    }

    // Every loop thread has been joined by now
    service.shutdown_single_threaded_cleanup();
    info!("Done");
    Ok(())
}

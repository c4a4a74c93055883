//! Why a lifecycle transition was refused, and why a report could not be saved.
//!
//! Instrumented code never sees a `TrackingError`: `start_tracking` logs it
//! and answers `false`. `ReportError` reaches the binary through `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    #[error("Task tracking is compiled out (build with the `tracking` feature)")]
    CompiledOut,

    #[error("Task tracking was shut down and cannot restart before single-threaded cleanup")]
    RestartAfterShutdown,
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report to {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

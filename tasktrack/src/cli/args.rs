//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::workload::WorkloadConfig;

#[derive(Parser, Debug)]
#[command(
    name = "tasktrack",
    about = "Run a message-loop workload and report where its tasks were born and died",
    after_help = "\
EXAMPLES:
    tasktrack                               Default workload, full report
    tasktrack -t 8 --tasks 200              Bigger workload
    tasktrack -q 'birth=Loop-1/file'        Only tasks posted on Loop-1, grouped by file
    tasktrack -q death --output report.txt  Group by death thread, write to a file

QUERY KEYWORDS:
    birth death file function line count duration totalduration
    queueduration totalqueueduration reset"
)]
pub struct Args {
    /// Number of message-loop threads
    #[arg(short, long, default_value = "4")]
    pub threads: usize,

    /// Tasks posted to each loop thread
    #[arg(long, default_value = "50")]
    pub tasks: usize,

    /// Tasks posted but never run (reported as still alive)
    #[arg(long, default_value = "3")]
    pub parked: usize,

    /// Report query, e.g. `birth=Loop-0/file/count`
    #[arg(short, long, default_value = "")]
    pub query: String,

    /// Write the report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(long)]
    pub quiet: bool,
}

impl Args {
    /// Workload settings taken from the command line
    #[must_use]
    pub fn workload(&self) -> WorkloadConfig {
        WorkloadConfig {
            loop_threads: self.threads,
            tasks_per_thread: self.tasks,
            parked_tasks: self.parked,
        }
    }
}

//! Synthetic message-loop workload
//!
//! Spawns named loop threads that each drain a channel of posted tasks. The
//! calling thread posts tasks round-robin, tallying a birth per post; loop
//! threads tally the matching death when a task finishes. Relay tasks post a
//! follow-up to the next loop from inside a loop, so births and deaths land on
//! different threads. Parked tasks are tallied but never sent, and stay alive.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info};
use tasktrack_common::here;

use crate::tracking::{BirthRecord, TrackingService};

const DELAYED_TASK_DELAY: Duration = Duration::from_micros(300);
const ROUNDS_PER_UNIT: u64 = 2_000;

/// Shape of the workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadConfig {
    pub loop_threads: usize,
    pub tasks_per_thread: usize,
    pub parked_tasks: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self { loop_threads: 4, tasks_per_thread: 50, parked_tasks: 3 }
    }
}

/// What the workload did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkloadSummary {
    /// Tasks posted from the driving thread
    pub posted: usize,
    /// Follow-ups posted from loop threads
    pub relayed: usize,
    /// Tasks that ran to completion
    pub completed: usize,
    /// Tasks tallied but never run
    pub parked: usize,
}

impl fmt::Display for WorkloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "posted: {}, relayed: {}, completed: {}, parked: {}",
            self.posted, self.relayed, self.completed, self.parked
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum TaskKind {
    Compute { units: u64 },
    Delayed,
    Relay,
}

struct PendingTask {
    birth: Option<Arc<BirthRecord>>,
    time_posted: Option<Instant>,
    delayed_start: Option<Instant>,
    kind: TaskKind,
}

enum LoopMessage {
    Run(PendingTask),
    Quit,
}

/// Run the workload against `service` and wait for every posted task.
///
/// The calling thread posts; name it first with
/// [`TrackingService::initialize_thread_context`] to see it by name in reports.
///
/// # Errors
///
/// Fails when there are no loop threads, when a loop thread cannot be spawned,
/// or when every loop thread has exited before its work completed.
pub fn run(service: &TrackingService, config: &WorkloadConfig) -> Result<WorkloadSummary> {
    if config.loop_threads == 0 {
        anyhow::bail!("At least one loop thread is required");
    }

    thread::scope(|scope| {
        let (senders, inboxes): (Vec<_>, Vec<_>) =
            (0..config.loop_threads).map(|_| unbounded::<LoopMessage>()).unzip();
        let result = spawn_and_drive(scope, service, config, &senders, inboxes);

        // Loops hold senders to each other, so they only stop when told to
        for sender in &senders {
            let _ = sender.send(LoopMessage::Quit);
        }
        result
    })
}

fn spawn_and_drive<'scope, 'env>(
    scope: &'scope thread::Scope<'scope, 'env>,
    service: &'env TrackingService,
    config: &WorkloadConfig,
    senders: &[Sender<LoopMessage>],
    inboxes: Vec<Receiver<LoopMessage>>,
) -> Result<WorkloadSummary> {
    let (done_tx, done_rx) = unbounded::<()>();
    for (index, inbox) in inboxes.into_iter().enumerate() {
        let name = format!("Loop-{index}");
        let next = senders[(index + 1) % senders.len()].clone();
        let done = done_tx.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn_scoped(scope, move || run_loop(service, &name, &inbox, &next, &done))
            .with_context(|| format!("Failed to spawn loop thread {index}"))?;
    }
    // Only loop threads keep completion senders, so a dead pool ends the wait
    drop(done_tx);
    drive(service, config, senders, &done_rx)
}

fn drive(
    service: &TrackingService,
    config: &WorkloadConfig,
    senders: &[Sender<LoopMessage>],
    done: &Receiver<()>,
) -> Result<WorkloadSummary> {
    let mut summary = WorkloadSummary::default();

    for i in 0..config.tasks_per_thread * senders.len() {
        let kind = match i % 4 {
            0 | 1 => TaskKind::Compute { units: (i % 5) as u64 + 1 },
            2 => TaskKind::Delayed,
            _ => TaskKind::Relay,
        };
        let task = post_task(service, kind);
        if matches!(kind, TaskKind::Relay) {
            summary.relayed += 1;
        }
        senders[i % senders.len()]
            .send(LoopMessage::Run(task))
            .context("Loop thread exited before the workload was posted")?;
        summary.posted += 1;
    }

    let parked: Vec<_> =
        (0..config.parked_tasks).map(|_| service.tally_birth_if_active(here!())).collect();
    summary.parked = parked.len();

    let expected = summary.posted + summary.relayed;
    for _ in 0..expected {
        done.recv().context("All loop threads exited before their work finished")?;
        summary.completed += 1;
    }
    info!("Workload finished ({summary})");
    Ok(summary)
}

/// Tally the birth of a task of `kind` and wrap it for a loop thread.
// Each arm is its own birth place
#[allow(clippy::match_same_arms)]
fn post_task(service: &TrackingService, kind: TaskKind) -> PendingTask {
    let birth = match kind {
        TaskKind::Compute { .. } => service.tally_birth_if_active(here!()),
        TaskKind::Delayed => service.tally_birth_if_active(here!()),
        TaskKind::Relay => service.tally_birth_if_active(here!()),
    };
    let time_posted = service.now();
    let delayed_start = match kind {
        TaskKind::Delayed => time_posted.map(|posted| posted + DELAYED_TASK_DELAY),
        _ => None,
    };
    PendingTask { birth, time_posted, delayed_start, kind }
}

fn run_loop(
    service: &TrackingService,
    name: &str,
    inbox: &Receiver<LoopMessage>,
    next: &Sender<LoopMessage>,
    done: &Sender<()>,
) {
    service.initialize_thread_context(name);
    for message in inbox {
        let LoopMessage::Run(task) = message else {
            break;
        };

        if let Some(delayed_start) = task.delayed_start {
            thread::sleep(delayed_start.saturating_duration_since(Instant::now()));
        }
        let start_of_run = service.now();
        match task.kind {
            TaskKind::Compute { units } => spin(units),
            TaskKind::Delayed => spin(1),
            TaskKind::Relay => {
                let follow_up = post_task(service, TaskKind::Compute { units: 1 });
                if next.send(LoopMessage::Run(follow_up)).is_err() {
                    debug!("{name}: next loop already stopped, dropping follow-up");
                }
            }
        }
        if let (Some(time_posted), Some(start_of_run)) = (task.time_posted, start_of_run) {
            service.tally_completed_run_if_active(
                task.birth.as_ref(),
                time_posted,
                task.delayed_start,
                start_of_run,
            );
        }
        if done.send(()).is_err() {
            break;
        }
    }
    debug!("{name} stopped");
}

/// Burn a little CPU so run durations are not all zero
fn spin(units: u64) {
    let mut acc = 0u64;
    for round in 0..units * ROUNDS_PER_UNIT {
        acc = std::hint::black_box(acc.wrapping_mul(31).wrapping_add(round));
    }
    std::hint::black_box(acc);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_loop_threads_rejected() {
        let service = TrackingService::new();
        let config = WorkloadConfig { loop_threads: 0, ..WorkloadConfig::default() };
        assert!(run(&service, &config).is_err());
    }

    #[test]
    fn test_summary_counts() {
        let service = TrackingService::new();
        service.start_tracking(true);
        let config = WorkloadConfig { loop_threads: 2, tasks_per_thread: 4, parked_tasks: 1 };
        let summary = run(&service, &config).expect("workload");

        assert_eq!(summary.posted, 8);
        assert_eq!(summary.relayed, 2);
        assert_eq!(summary.completed, 10);
        assert_eq!(summary.parked, 1);
    }

    #[test]
    fn test_runs_without_tracking() {
        let service = TrackingService::new();
        let config = WorkloadConfig { loop_threads: 1, tasks_per_thread: 3, parked_tasks: 2 };
        let summary = run(&service, &config).expect("workload");
        assert_eq!(summary.completed, 3);
        assert!(service.threads().iter().all(|t| t.snapshot_births().is_empty()));
    }
}

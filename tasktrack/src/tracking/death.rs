//! Death tallies: completions of work born at one place, seen on one thread.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::clock::duration_to_nanos;

/// Completion statistics for one birth record.
///
/// Plain value type: used for snapshot copies, aggregations, and the synthetic
/// "still alive" rows. Live counters are kept in [`LiveDeathTally`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeathTally {
    count: u64,
    run_duration: Duration,
    queue_duration: Duration,
}

impl DeathTally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally of `count` births with no death seen yet (zero durations)
    #[must_use]
    pub fn still_alive(count: u64) -> Self {
        Self { count, ..Self::default() }
    }

    /// Record one completion that waited `queue_duration` and ran for `run_duration`.
    pub fn record_death(&mut self, queue_duration: Duration, run_duration: Duration) {
        self.count = self.count.saturating_add(1);
        self.queue_duration = self.queue_duration.saturating_add(queue_duration);
        self.run_duration = self.run_duration.saturating_add(run_duration);
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn run_duration(&self) -> Duration {
        self.run_duration
    }

    #[must_use]
    pub fn queue_duration(&self) -> Duration {
        self.queue_duration
    }

    /// Mean run time per completion; zero when nothing completed
    #[must_use]
    pub fn average_run_duration(&self) -> Duration {
        average(self.run_duration, self.count)
    }

    /// Mean queueing delay per completion; zero when nothing completed
    #[must_use]
    pub fn average_queue_duration(&self) -> Duration {
        average(self.queue_duration, self.count)
    }

    /// Merge `other` into this tally. Only used on copies, never live data.
    pub fn add(&mut self, other: &DeathTally) {
        self.count = self.count.saturating_add(other.count);
        self.run_duration = self.run_duration.saturating_add(other.run_duration);
        self.queue_duration = self.queue_duration.saturating_add(other.queue_duration);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(duration_to_nanos(total) / count)
}

impl fmt::Display for DeathTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return Ok(());
        }
        let label = if self.count == 1 { "Life" } else { "Lives" };
        write!(
            f,
            "{label}:{}, Run:{}ms({}ms/life) Queue:{}ms({}ms/life) ",
            self.count,
            self.run_duration.as_millis(),
            self.average_run_duration().as_millis(),
            self.queue_duration.as_millis(),
            self.average_queue_duration().as_millis(),
        )
    }
}

/// Live counters behind a [`DeathTally`], written by the death thread only.
///
/// Same single-writer discipline as birth counts: relaxed load then store, so
/// a concurrent reset or snapshot never blocks the writer.
#[derive(Debug, Default)]
pub(crate) struct LiveDeathTally {
    count: AtomicU64,
    run_nanos: AtomicU64,
    queue_nanos: AtomicU64,
}

impl LiveDeathTally {
    pub(crate) fn record(&self, queue_duration: Duration, run_duration: Duration) {
        bump(&self.count, 1);
        bump(&self.queue_nanos, duration_to_nanos(queue_duration));
        bump(&self.run_nanos, duration_to_nanos(run_duration));
    }

    /// Copy the counters out. Fields are read independently, so a copy taken
    /// while the owner is writing can mix old and new values.
    pub(crate) fn snapshot(&self) -> DeathTally {
        DeathTally {
            count: self.count.load(Ordering::Relaxed),
            run_duration: Duration::from_nanos(self.run_nanos.load(Ordering::Relaxed)),
            queue_duration: Duration::from_nanos(self.queue_nanos.load(Ordering::Relaxed)),
        }
    }

    pub(crate) fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.run_nanos.store(0, Ordering::Relaxed);
        self.queue_nanos.store(0, Ordering::Relaxed);
    }
}

fn bump(counter: &AtomicU64, by: u64) {
    let value = counter.load(Ordering::Relaxed);
    counter.store(value.saturating_add(by), Ordering::Relaxed);
}

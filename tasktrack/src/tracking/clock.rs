//! Time sources for run and queue durations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of monotonic "now" readings.
///
/// The tracking service reads it once when a task finishes to close the run
/// duration. Implementations must be cheap and thread-safe.
pub trait ClockSource: Send + Sync {
    /// Current monotonic time
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
///
/// Starts at the instant it was created and only moves when told to.
#[derive(Debug)]
pub struct CounterClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl CounterClock {
    /// Create a clock frozen at the current instant
    #[must_use]
    pub fn new() -> Self {
        Self { origin: Instant::now(), offset_nanos: AtomicU64::new(0) }
    }

    /// The instant this clock started from
    #[must_use]
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Move time forward by `by`
    pub fn advance(&self, by: Duration) {
        self.offset_nanos.fetch_add(duration_to_nanos(by), Ordering::SeqCst);
    }

    /// Set time to `origin + offset`
    pub fn set(&self, offset: Duration) {
        self.offset_nanos.store(duration_to_nanos(offset), Ordering::SeqCst);
    }
}

impl Default for CounterClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for CounterClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

/// Clamp a duration into the nanosecond counters used by live tallies.
pub(crate) fn duration_to_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_clock_advances() {
        let clock = CounterClock::new();
        let start = clock.now();
        assert_eq!(start, clock.origin());

        clock.advance(Duration::from_millis(5));
        clock.advance(Duration::from_millis(2));
        assert_eq!(clock.now() - start, Duration::from_millis(7));

        clock.set(Duration::from_millis(1));
        assert_eq!(clock.now() - start, Duration::from_millis(1));
    }

    #[test]
    fn test_duration_to_nanos_saturates() {
        assert_eq!(duration_to_nanos(Duration::from_micros(3)), 3_000);
        assert_eq!(duration_to_nanos(Duration::MAX), u64::MAX);
    }
}

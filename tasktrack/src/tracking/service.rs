//! Tracking service: lifecycle, thread registry and the instrumentation entry points.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tasktrack_common::Location;

use super::birth::BirthRecord;
use super::clock::{ClockSource, SystemClock};
use super::thread_data::{CurrentThread, ThreadData};
use crate::domain::{Status, ThreadRef, ThreadSeq, TrackingError};

/// Whether the `tracking` feature was enabled at build time.
pub const TRACKING_COMPILED_IN: bool = cfg!(feature = "tracking");

static NEXT_SERVICE_ID: AtomicU64 = AtomicU64::new(1);

/// A thread's handle into one service, valid for one registry generation.
struct ThreadSlot {
    service_id: u64,
    /// Dead once the service is dropped
    service_alive: Weak<()>,
    generation: u64,
    /// Name asked for before the thread registered
    requested_name: Option<String>,
    /// Set on the first use while the service is active
    current: Option<CurrentThread>,
}

thread_local! {
    // One entry per live service this thread has used; almost always one.
    static THREAD_SLOTS: RefCell<Vec<ThreadSlot>> = const { RefCell::new(Vec::new()) };
}

#[derive(Default)]
struct Registry {
    threads: Vec<Arc<ThreadData>>,
    next_seq: u32,
    worker_count: u32,
}

/// Process-wide bookkeeping of task births and deaths.
///
/// Holds the lifecycle status, the registry of every thread that has tallied
/// anything, and the clock used to close run durations. Instrumented code
/// normally goes through [`TrackingService::global`]; tests and embedders can
/// build isolated services, each with its own per-thread state.
///
/// # Lifecycle
///
/// ```text
/// Uninitialized ──start(true)──▶ Active ──start(false)──▶ Shutdown
///       ▲                                                    │
///       └───────────── shutdown_single_threaded_cleanup ─────┘
/// ```
pub struct TrackingService {
    id: u64,
    alive: Arc<()>,
    status: AtomicU8,
    generation: AtomicU64,
    registry: Mutex<Registry>,
    clock: Arc<dyn ClockSource>,
}

impl TrackingService {
    /// Create an uninitialized service reading the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an uninitialized service reading `clock`
    #[must_use]
    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        Self {
            id: NEXT_SERVICE_ID.fetch_add(1, Ordering::Relaxed),
            alive: Arc::new(()),
            status: AtomicU8::new(Status::Uninitialized.as_u8()),
            generation: AtomicU64::new(0),
            registry: Mutex::new(Registry::default()),
            clock,
        }
    }

    /// The service used by process-wide instrumentation
    #[must_use]
    pub fn global() -> &'static TrackingService {
        static GLOBAL: OnceLock<TrackingService> = OnceLock::new();
        GLOBAL.get_or_init(TrackingService::new)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Current lifecycle state. May be slightly stale when read concurrently
    /// with a transition.
    #[must_use]
    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status() == Status::Active
    }

    /// Turn tallying on or off. Returns whether the requested state holds.
    ///
    /// Disabling is idempotent. Re-enabling after a shutdown is refused until
    /// [`shutdown_single_threaded_cleanup`](Self::shutdown_single_threaded_cleanup)
    /// has run, and nothing can be enabled when tracking is compiled out.
    pub fn start_tracking(&self, enable: bool) -> bool {
        match self.transition(enable) {
            Ok(status) => {
                info!("Task tracking is now {status}");
                true
            }
            Err(err) => {
                warn!("Task tracking not started: {err}");
                false
            }
        }
    }

    fn transition(&self, enable: bool) -> Result<Status, TrackingError> {
        if !TRACKING_COMPILED_IN {
            return Err(TrackingError::CompiledOut);
        }
        let target = if enable { Status::Active } else { Status::Shutdown };
        self.status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                let refused = enable && Status::from_u8(raw) == Status::Shutdown;
                (!refused).then_some(target.as_u8())
            })
            .map_err(|_| TrackingError::RestartAfterShutdown)?;
        Ok(target)
    }

    /// Throw away every registered thread and return to `Uninitialized`.
    ///
    /// Only valid once every other thread that tallied into this service has
    /// stopped doing so. Threads that survive the cleanup register afresh on
    /// their next tally; their old records are no longer reachable from the
    /// registry.
    pub fn shutdown_single_threaded_cleanup(&self) {
        let released = {
            let mut registry = self.lock_registry();
            let released = registry.threads.len();
            *registry = Registry::default();
            released
        };
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.status.store(Status::Uninitialized.as_u8(), Ordering::Release);
        self.forget_calling_thread();
        info!("Task tracking cleaned up, released {released} thread record(s)");
    }

    // ========================================================================
    // Registry
    // ========================================================================

    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, name: Option<&str>) -> Arc<ThreadData> {
        let mut registry = self.lock_registry();
        let seq = ThreadSeq(registry.next_seq);
        registry.next_seq += 1;
        let name = if let Some(name) = name {
            name.to_owned()
        } else {
            registry.worker_count += 1;
            format!("WorkerThread-{}", registry.worker_count)
        };
        debug!("Registered {name} as {seq}");
        let data = Arc::new(ThreadData::new(ThreadRef::new(seq, name)));
        registry.threads.push(Arc::clone(&data));
        data
    }

    /// Run `f` with the calling thread's handle, registering the thread first
    /// if needed. `None` unless the service is active, when thread-local
    /// storage is gone (thread exit) or on re-entry from inside `f`.
    pub fn with_current_thread<R>(&self, f: impl FnOnce(&mut CurrentThread) -> R) -> Option<R> {
        if !self.is_active() {
            return None;
        }
        let generation = self.generation.load(Ordering::Acquire);
        THREAD_SLOTS
            .try_with(|slots| {
                let Ok(mut slots) = slots.try_borrow_mut() else {
                    return None;
                };
                let index = self.slot_index(&mut slots, generation);
                let slot = &mut slots[index];
                let current = slot.current.get_or_insert_with(|| {
                    CurrentThread::new(self.register(slot.requested_name.as_deref()))
                });
                Some(f(current))
            })
            .ok()
            .flatten()
    }

    /// Index of this service's slot, creating an empty one if missing.
    ///
    /// Drops the slots of dropped services and of older registry generations
    /// on the way, so the vector only holds live services.
    fn slot_index(&self, slots: &mut Vec<ThreadSlot>, generation: u64) -> usize {
        slots.retain(|slot| {
            slot.service_alive.strong_count() > 0
                && (slot.service_id != self.id || slot.generation == generation)
        });
        if let Some(index) = slots.iter().position(|slot| slot.service_id == self.id) {
            return index;
        }
        slots.push(ThreadSlot {
            service_id: self.id,
            service_alive: Arc::downgrade(&self.alive),
            generation,
            requested_name: None,
            current: None,
        });
        slots.len() - 1
    }

    /// Release the calling thread's slot for this service
    fn forget_calling_thread(&self) {
        let _ = THREAD_SLOTS.try_with(|slots| {
            if let Ok(mut slots) = slots.try_borrow_mut() {
                slots.retain(|slot| slot.service_id != self.id);
            }
        });
    }

    /// This thread's data, registering it on first use. `None` unless active.
    #[must_use]
    pub fn get_current(&self) -> Option<Arc<ThreadData>> {
        self.with_current_thread(|current| Arc::clone(current.data()))
    }

    /// Name the calling thread before it tallies anything.
    ///
    /// Before activation the name is remembered and used when the thread
    /// registers. The first name sticks. Returns `false` when the service is
    /// shut down or tracking is compiled out.
    pub fn initialize_thread_context(&self, name: &str) -> bool {
        if !TRACKING_COMPILED_IN || self.status() == Status::Shutdown {
            return false;
        }
        let generation = self.generation.load(Ordering::Acquire);
        let named = THREAD_SLOTS
            .try_with(|slots| {
                let Ok(mut slots) = slots.try_borrow_mut() else {
                    return false;
                };
                let index = self.slot_index(&mut slots, generation);
                let slot = &mut slots[index];
                if slot.current.is_none() && slot.requested_name.is_none() {
                    slot.requested_name = Some(name.to_owned());
                } else {
                    debug!("Thread already named, not renaming to {name}");
                }
                true
            })
            .unwrap_or(false);
        if named {
            // Registers right away when already active
            self.with_current_thread(|_| ());
        }
        named
    }

    /// Most recently registered thread, if any
    #[must_use]
    pub fn first(&self) -> Option<Arc<ThreadData>> {
        self.lock_registry().threads.last().cloned()
    }

    /// Every registered thread, newest first.
    ///
    /// Returns a copy so callers can walk it without holding the registry lock.
    #[must_use]
    pub fn threads(&self) -> Vec<Arc<ThreadData>> {
        self.lock_registry().threads.iter().rev().cloned().collect()
    }

    /// Zero all counters on every registered thread.
    ///
    /// Not atomic with respect to concurrent tallying: a birth or death racing
    /// the reset may be kept or dropped.
    pub fn reset_all_thread_data(&self) {
        let threads = self.threads();
        for thread in &threads {
            thread.reset();
        }
        info!("Reset tracking data of {} thread(s)", threads.len());
    }

    // ========================================================================
    // Instrumentation
    // ========================================================================

    /// Current time, or `None` while inactive so callers can skip the read.
    #[must_use]
    pub fn now(&self) -> Option<Instant> {
        self.is_active().then(|| self.clock.now())
    }

    /// Count a birth at `location` on the calling thread.
    ///
    /// Returns the handle to pass back at completion, or `None` while inactive.
    pub fn tally_birth_if_active(&self, location: Location) -> Option<Arc<BirthRecord>> {
        if !self.is_active() {
            return None;
        }
        self.with_current_thread(|current| current.tally_birth(location))
    }

    /// Count one completion of `birth` on the calling thread. No-op while
    /// inactive or when `birth` is `None`.
    pub fn tally_death_if_active(
        &self,
        birth: Option<&Arc<BirthRecord>>,
        queue_duration: Duration,
        run_duration: Duration,
    ) {
        let Some(birth) = birth else {
            return;
        };
        if !self.is_active() {
            return;
        }
        self.with_current_thread(|current| {
            current.tally_death(birth, queue_duration, run_duration);
        });
    }

    /// Count a completed run, deriving durations from its timestamps.
    ///
    /// Queueing runs from `delayed_start` (or `time_posted` when the task was
    /// not delayed) to `start_of_run`; the run lasts from `start_of_run` to now.
    pub fn tally_completed_run_if_active(
        &self,
        birth: Option<&Arc<BirthRecord>>,
        time_posted: Instant,
        delayed_start: Option<Instant>,
        start_of_run: Instant,
    ) {
        if birth.is_none() || !self.is_active() {
            return;
        }
        let queued_since = delayed_start.unwrap_or(time_posted);
        let queue = start_of_run.saturating_duration_since(queued_since);
        let run = self.clock.now().saturating_duration_since(start_of_run);
        self.tally_death_if_active(birth, queue, run);
    }

    /// Move one birth of `birth` to `location`.
    ///
    /// Must be called on the thread that tallied the original birth.
    pub fn reattribute_birth(
        &self,
        birth: &Arc<BirthRecord>,
        location: Location,
    ) -> Option<Arc<BirthRecord>> {
        if !self.is_active() {
            return None;
        }
        self.with_current_thread(|current| {
            debug_assert_eq!(current.data().seq(), birth.birth_thread().seq());
            birth.forget_birth();
            current.tally_birth(location)
        })
    }
}

impl Default for TrackingService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TrackingService {
    fn drop(&mut self) {
        // Slots on other threads go on their next lookup
        self.forget_calling_thread();
    }
}

impl fmt::Debug for TrackingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingService")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// AutoTracking
// ============================================================================

static AUTO_STARTED: AtomicBool = AtomicBool::new(false);

/// Scope guard that turns on the global service.
///
/// Only the first guard created in the process starts tracking; dropping that
/// guard stops it again. Later guards do nothing.
#[must_use = "tracking stops when the guard is dropped"]
#[derive(Debug)]
pub struct AutoTracking {
    owner: bool,
}

impl AutoTracking {
    pub fn new() -> Self {
        let owner = !AUTO_STARTED.swap(true, Ordering::AcqRel);
        if owner {
            TrackingService::global().start_tracking(true);
        }
        Self { owner }
    }

    /// Whether this guard is the one that started tracking
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.owner
    }
}

impl Default for AutoTracking {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AutoTracking {
    fn drop(&mut self) {
        if self.owner {
            TrackingService::global().start_tracking(false);
        }
    }
}

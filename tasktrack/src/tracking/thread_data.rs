//! Per-thread birth and death maps.
//!
//! Each participating thread owns one [`ThreadData`], shared with the registry
//! through an `Arc`. The owning thread reaches it through a [`CurrentThread`]
//! kept in thread-local storage, which caches every record it has handed out:
//! once a location or birth record is known, tallying is a local hash lookup
//! and a relaxed atomic store. The per-instance lock is only taken to add a
//! new key and to read the maps from another thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tasktrack_common::Location;

use super::birth::{BirthKey, BirthRecord};
use super::death::{DeathTally, LiveDeathTally};
use crate::domain::{ThreadRef, ThreadSeq};

/// Copy of a thread's births, keyed by place of birth
pub type BirthMap = HashMap<Location, Arc<BirthRecord>>;

/// Copy of a thread's deaths, keyed by the birth record they complete
pub type DeathMap = HashMap<BirthKey, DeathTally>;

#[derive(Debug, Default)]
struct ThreadMaps {
    births: HashMap<Location, Arc<BirthRecord>>,
    deaths: HashMap<BirthKey, Arc<LiveDeathTally>>,
}

/// Everything one thread has tallied.
#[derive(Debug)]
pub struct ThreadData {
    thread: ThreadRef,
    maps: Mutex<ThreadMaps>,
}

impl ThreadData {
    pub(crate) fn new(thread: ThreadRef) -> Self {
        Self { thread, maps: Mutex::new(ThreadMaps::default()) }
    }

    /// Reference to this thread, as stored in birth records and snapshots
    #[must_use]
    pub fn thread(&self) -> &ThreadRef {
        &self.thread
    }

    #[must_use]
    pub fn thread_name(&self) -> &str {
        self.thread.name()
    }

    #[must_use]
    pub fn seq(&self) -> ThreadSeq {
        self.thread.seq()
    }

    fn lock(&self) -> MutexGuard<'_, ThreadMaps> {
        self.maps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy the birth map. Safe from any thread.
    #[must_use]
    pub fn snapshot_births(&self) -> BirthMap {
        self.lock().births.clone()
    }

    /// Copy the death map, reading each live tally once. Safe from any thread.
    #[must_use]
    pub fn snapshot_deaths(&self) -> DeathMap {
        self.lock()
            .deaths
            .iter()
            .map(|(key, live)| (key.clone(), live.snapshot()))
            .collect()
    }

    /// Zero every birth count and death tally of this thread.
    ///
    /// Map entries are kept. Counters are cleared without coordinating with
    /// the owner, so a tally racing the reset can survive or be lost.
    pub fn reset(&self) {
        let maps = self.lock();
        for record in maps.births.values() {
            record.clear();
        }
        for live in maps.deaths.values() {
            live.clear();
        }
    }

    fn register_birth(&self, location: Location, record: &Arc<BirthRecord>) {
        self.lock().births.insert(location, Arc::clone(record));
    }

    fn register_death(&self, birth: &Arc<BirthRecord>, live: &Arc<LiveDeathTally>) {
        self.lock().deaths.insert(BirthKey::new(Arc::clone(birth)), Arc::clone(live));
    }
}

/// Owner-side handle to the calling thread's [`ThreadData`].
///
/// Lives in thread-local storage and is never shared, so its caches need no
/// synchronization.
#[derive(Debug)]
pub struct CurrentThread {
    data: Arc<ThreadData>,
    births: HashMap<Location, Arc<BirthRecord>>,
    deaths: HashMap<usize, Arc<LiveDeathTally>>,
}

impl CurrentThread {
    pub(crate) fn new(data: Arc<ThreadData>) -> Self {
        Self { data, births: HashMap::new(), deaths: HashMap::new() }
    }

    /// Shared data this handle writes to
    #[must_use]
    pub fn data(&self) -> &Arc<ThreadData> {
        &self.data
    }

    /// Count a birth at `location` and return its record.
    pub fn tally_birth(&mut self, location: Location) -> Arc<BirthRecord> {
        let record = match self.births.get(&location) {
            Some(record) => Arc::clone(record),
            None => {
                let record = Arc::new(BirthRecord::new(location, self.data.thread.clone()));
                self.data.register_birth(location, &record);
                self.births.insert(location, Arc::clone(&record));
                record
            }
        };
        record.record_birth();
        record
    }

    /// Count one completion of work born as `birth`.
    ///
    /// `birth` may come from any thread; the tally is kept on this one.
    pub fn tally_death(&mut self, birth: &Arc<BirthRecord>, queue: Duration, run: Duration) {
        let addr = BirthKey::addr(birth);
        let live = match self.deaths.get(&addr) {
            Some(live) => Arc::clone(live),
            None => {
                let live = Arc::new(LiveDeathTally::default());
                self.data.register_death(birth, &live);
                self.deaths.insert(addr, Arc::clone(&live));
                live
            }
        };
        live.record(queue, run);
    }
}

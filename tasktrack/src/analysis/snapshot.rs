//! Point-in-time copy of one birth/death pairing.

use std::fmt;
use std::sync::Arc;

use crate::domain::ThreadRef;
use crate::tracking::{BirthRecord, DeathTally};

/// Name shown as the death thread of work that has not finished yet
pub const STILL_ALIVE: &str = "Still_Alive";

/// Deaths of one birth record as seen on one thread, copied out of the live maps.
///
/// The tally is owned, so later resets or tallies do not change it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    birth: Arc<BirthRecord>,
    death_thread: Option<ThreadRef>,
    death_data: DeathTally,
}

impl Snapshot {
    /// Completions tallied on `death_thread`
    #[must_use]
    pub fn new(birth: Arc<BirthRecord>, death_thread: ThreadRef, death_data: DeathTally) -> Self {
        Self { birth, death_thread: Some(death_thread), death_data }
    }

    /// `count` births of `birth` with no matching death yet
    #[must_use]
    pub fn still_alive(birth: Arc<BirthRecord>, count: u64) -> Self {
        Self { birth, death_thread: None, death_data: DeathTally::still_alive(count) }
    }

    #[must_use]
    pub fn birth(&self) -> &Arc<BirthRecord> {
        &self.birth
    }

    #[must_use]
    pub fn birth_thread(&self) -> &ThreadRef {
        self.birth.birth_thread()
    }

    /// Thread the deaths were tallied on; `None` while still alive
    #[must_use]
    pub fn death_thread(&self) -> Option<&ThreadRef> {
        self.death_thread.as_ref()
    }

    #[must_use]
    pub fn death_thread_name(&self) -> &str {
        self.death_thread.as_ref().map_or(STILL_ALIVE, ThreadRef::name)
    }

    #[must_use]
    pub fn death_data(&self) -> &DeathTally {
        &self.death_data
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.death_data.count()
    }

    /// Merge another snapshot's tally into this one, for aggregate rows.
    pub fn add(&mut self, other: &Snapshot) {
        self.death_data.add(&other.death_data);
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}->{} {}",
            self.death_data,
            self.birth_thread(),
            self.death_thread_name(),
            self.birth.location()
        )
    }
}

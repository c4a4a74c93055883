//! Gathers snapshots from every registered thread.

use std::collections::HashMap;

use crate::tracking::{BirthKey, ThreadData, TrackingService};

use super::snapshot::Snapshot;

/// Walks thread data and turns it into a flat list of [`Snapshot`]s.
///
/// Besides one snapshot per (birth record, death thread) pair, the collector
/// keeps births minus observed deaths per record so that work that never
/// finished can be listed as still alive.
#[derive(Debug, Default)]
pub struct Collector {
    collection: Vec<Snapshot>,
    global_birth_count: HashMap<BirthKey, i64>,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every thread registered with `service`.
    #[must_use]
    pub fn collect(service: &TrackingService) -> Self {
        let mut collector = Self::new();
        for thread in service.threads() {
            collector.append(&thread);
        }
        collector
    }

    /// Add the deaths of one thread and account for its births.
    pub fn append(&mut self, thread: &ThreadData) {
        let births = thread.snapshot_births();
        let deaths = thread.snapshot_deaths();

        for (key, tally) in deaths {
            *self.global_birth_count.entry(key.clone()).or_default() -= to_signed(tally.count());
            self.collection.push(Snapshot::new(
                key.record().clone(),
                thread.thread().clone(),
                tally,
            ));
        }

        for record in births.into_values() {
            let births = to_signed(record.birth_count());
            *self.global_birth_count.entry(BirthKey::new(record)).or_default() += births;
        }
    }

    /// Add a "still alive" snapshot for every record with unmatched births.
    ///
    /// Consumes the running counts, so a second call adds nothing.
    pub fn add_list_of_living_objects(&mut self) {
        for (key, remaining) in self.global_birth_count.drain() {
            if let Ok(count @ 1..) = u64::try_from(remaining) {
                self.collection.push(Snapshot::still_alive(key.record().clone(), count));
            }
        }
    }

    #[must_use]
    pub fn collection(&self) -> &[Snapshot] {
        &self.collection
    }

    #[must_use]
    pub fn into_collection(self) -> Vec<Snapshot> {
        self.collection
    }
}

fn to_signed(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

//! Running totals over a group of snapshots.

use std::collections::HashMap;
use std::fmt;

use tasktrack_common::Location;

use crate::domain::ThreadRef;
use crate::tracking::DeathTally;

use super::snapshot::Snapshot;

/// Totals for a group of equivalent snapshots, or for a whole report.
///
/// Besides merging death tallies it counts how often each file, location,
/// birth thread and death thread occurs, so the summary can name a value the
/// whole group shares or say how many distinct ones there are.
#[derive(Debug, Default)]
pub struct Aggregation {
    birth_count: u64,
    birth_files: HashMap<&'static str, u64>,
    locations: HashMap<Location, u64>,
    birth_threads: HashMap<ThreadRef, u64>,
    death_threads: HashMap<Option<ThreadRef>, u64>,
    death_data: DeathTally,
}

impl Aggregation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one snapshot: its births, birth place and death thread.
    pub fn add_death_snapshot(&mut self, snapshot: &Snapshot) {
        self.add_births(snapshot.count(), snapshot.birth_thread(), snapshot.birth().location());
        *self.death_threads.entry(snapshot.death_thread().cloned()).or_default() += 1;
        self.death_data.add(snapshot.death_data());
    }

    /// Count `count` births at `location` on `thread`.
    pub fn add_births(&mut self, count: u64, thread: &ThreadRef, location: Location) {
        self.add_birth_place(location);
        *self.birth_threads.entry(thread.clone()).or_default() += 1;
        self.birth_count = self.birth_count.saturating_add(count);
    }

    /// Count one birth at `location` on `thread`.
    pub fn add_birth(&mut self, thread: &ThreadRef, location: Location) {
        self.add_births(1, thread, location);
    }

    pub fn add_birth_place(&mut self, location: Location) {
        *self.locations.entry(location).or_default() += 1;
        *self.birth_files.entry(location.file()).or_default() += 1;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn birth_count(&self) -> u64 {
        self.birth_count
    }

    #[must_use]
    pub fn death_data(&self) -> &DeathTally {
        &self.death_data
    }

    #[must_use]
    pub fn distinct_locations(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn distinct_files(&self) -> usize {
        self.birth_files.len()
    }

    #[must_use]
    pub fn distinct_birth_threads(&self) -> usize {
        self.birth_threads.len()
    }

    #[must_use]
    pub fn distinct_death_threads(&self) -> usize {
        self.death_threads.len()
    }
}

/// The only key of a map with exactly one entry
fn sole_key<K, V>(map: &HashMap<K, V>) -> Option<&K> {
    let mut keys = map.keys();
    match (keys.next(), keys.next()) {
        (Some(key), None) => Some(key),
        _ => None,
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = sole_key(&self.locations) {
            write!(f, "{location} ")?;
        } else {
            write!(f, "{} Locations. ", self.locations.len())?;
            match sole_key(&self.birth_files) {
                Some(file) => write!(f, "All born in {file}. ")?,
                None => write!(f, "{} Files. ", self.birth_files.len())?,
            }
        }

        match sole_key(&self.birth_threads) {
            Some(thread) => write!(f, "All born on {thread}. ")?,
            None => write!(f, "{} BirthingThreads. ", self.birth_threads.len())?,
        }

        match sole_key(&self.death_threads) {
            Some(Some(thread)) => write!(f, "All deleted on {thread}. ")?,
            Some(None) => write!(f, "All these objects are still alive. ")?,
            None => write!(f, "{} DeathThreads. ", self.death_threads.len())?,
        }

        if self.birth_count > 1 {
            write!(f, "Births={} ", self.birth_count)?;
        }
        write!(f, "{}", self.death_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::snapshot::STILL_ALIVE;
    use crate::domain::ThreadSeq;
    use crate::tracking::BirthRecord;
    use std::sync::Arc;
    use std::time::Duration;

    fn record(file: &'static str, line: u32, seq: u32, name: &str) -> Arc<BirthRecord> {
        Arc::new(BirthRecord::new(
            Location::new(file, "demo::post", line),
            ThreadRef::new(ThreadSeq(seq), name),
        ))
    }

    fn death(count: u64) -> DeathTally {
        let mut tally = DeathTally::new();
        for _ in 0..count {
            tally.record_death(Duration::from_millis(1), Duration::from_millis(2));
        }
        tally
    }

    #[test]
    fn test_single_location_group() {
        let io = ThreadRef::new(ThreadSeq(1), "IO");
        let mut agg = Aggregation::new();
        agg.add_death_snapshot(&Snapshot::new(record("a.rs", 3, 0, "UI"), io.clone(), death(2)));

        assert_eq!(
            agg.to_string(),
            "a.rs[3] demo::post All born on UI. All deleted on IO. Births=2 \
             Lives:2, Run:4ms(2ms/life) Queue:2ms(1ms/life) "
        );
    }

    #[test]
    fn test_mixed_group_shows_cardinalities() {
        let io = ThreadRef::new(ThreadSeq(2), "IO");
        let mut agg = Aggregation::new();
        agg.add_death_snapshot(&Snapshot::new(record("a.rs", 3, 0, "UI"), io.clone(), death(1)));
        agg.add_death_snapshot(&Snapshot::new(record("a.rs", 4, 1, "DB"), io, death(1)));
        agg.add_death_snapshot(&Snapshot::still_alive(record("b.rs", 5, 1, "DB"), 1));

        assert_eq!(agg.distinct_locations(), 3);
        assert_eq!(agg.distinct_files(), 2);
        assert_eq!(agg.distinct_death_threads(), 2);
        let text = agg.to_string();
        assert!(text.starts_with("3 Locations. 2 Files. 2 BirthingThreads. 2 DeathThreads. Births=3 "));
    }

    #[test]
    fn test_still_alive_group() {
        let mut agg = Aggregation::new();
        agg.add_death_snapshot(&Snapshot::still_alive(record("a.rs", 3, 0, "UI"), 1));
        agg.add_death_snapshot(&Snapshot::still_alive(record("a.rs", 9, 0, "UI"), 4));
        let text = agg.to_string();
        assert!(text.contains("All born in a.rs. "));
        assert!(text.contains("All these objects are still alive. "));
        assert!(!text.contains(STILL_ALIVE));
    }

    #[test]
    fn test_add_birth_and_clear() {
        let ui = ThreadRef::new(ThreadSeq(0), "UI");
        let mut agg = Aggregation::new();
        agg.add_birth(&ui, Location::new("a.rs", "f", 1));
        agg.add_births(4, &ui, Location::new("a.rs", "f", 1));
        assert_eq!(agg.birth_count(), 5);
        assert_eq!(agg.distinct_birth_threads(), 1);

        agg.clear();
        assert_eq!(agg.birth_count(), 0);
        assert_eq!(agg.distinct_locations(), 0);
    }

    #[test]
    fn test_birth_count_saturates() {
        let ui = ThreadRef::new(ThreadSeq(0), "UI");
        let location = Location::new("a.rs", "demo::post", 3);
        let mut agg = Aggregation::new();
        agg.add_births(u64::MAX, &ui, location);
        agg.add_births(u64::MAX, &ui, location);
        assert_eq!(agg.birth_count(), u64::MAX);
    }
}

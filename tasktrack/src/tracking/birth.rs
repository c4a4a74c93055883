//! Birth records: how many units of work one thread created at one place.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tasktrack_common::Location;

use crate::domain::ThreadRef;

/// Births at one [`Location`] on one thread.
///
/// The location and birth thread never change, so any thread may read them.
/// `birth_count` is written only by the birth thread. Writes are a relaxed
/// load followed by a relaxed store rather than a read-modify-write: a reset
/// racing an increment may lose one of the two, which readers tolerate.
#[derive(Debug)]
pub struct BirthRecord {
    location: Location,
    birth_thread: ThreadRef,
    birth_count: AtomicU64,
}

impl BirthRecord {
    /// Create an empty record for births at `location` on `birth_thread`
    pub fn new(location: Location, birth_thread: ThreadRef) -> Self {
        Self { location, birth_thread, birth_count: AtomicU64::new(0) }
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    #[must_use]
    pub fn birth_thread(&self) -> &ThreadRef {
        &self.birth_thread
    }

    /// Births tallied so far (a point sample when read off-thread)
    #[must_use]
    pub fn birth_count(&self) -> u64 {
        self.birth_count.load(Ordering::Relaxed)
    }

    /// Count one more birth. Birth thread only.
    pub fn record_birth(&self) {
        let count = self.birth_count.load(Ordering::Relaxed);
        self.birth_count.store(count.saturating_add(1), Ordering::Relaxed);
    }

    /// Take back one birth whose place of birth was corrected. Birth thread only.
    pub fn forget_birth(&self) {
        let count = self.birth_count.load(Ordering::Relaxed);
        self.birth_count.store(count.saturating_sub(1), Ordering::Relaxed);
    }

    /// Zero the counter.
    pub fn clear(&self) {
        self.birth_count.store(0, Ordering::Relaxed);
    }
}

/// Identity key for a shared [`BirthRecord`].
///
/// Death maps are keyed by *which* record a death belongs to, not by its
/// contents: the same location born on two threads makes two records.
#[derive(Debug, Clone)]
pub struct BirthKey(Arc<BirthRecord>);

impl BirthKey {
    pub fn new(record: Arc<BirthRecord>) -> Self {
        Self(record)
    }

    /// The record this key stands for
    #[must_use]
    pub fn record(&self) -> &Arc<BirthRecord> {
        &self.0
    }

    /// Address used as identity, also usable as a key without cloning the Arc
    #[must_use]
    pub fn addr(record: &Arc<BirthRecord>) -> usize {
        Arc::as_ptr(record) as usize
    }
}

impl PartialEq for BirthKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for BirthKey {}

impl Hash for BirthKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Self::addr(&self.0).hash(state);
    }
}

//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep a registration number from being confused with
//! an OS thread id, and keep the lifecycle state out of bare integers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Registration sequence number of a tracked thread
///
/// Assigned in registration order, starting at 0, by the registry that owns
/// the thread's data. This is NOT the OS thread id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadSeq(pub u32);

impl fmt::Display for ThreadSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread#{}", self.0)
    }
}

/// Non-owning reference to a tracked thread
///
/// Carried by birth records and snapshots to say which thread a birth or a
/// death happened on. Identity is the registration number; the name is
/// display metadata, so two threads sharing a name stay distinct.
#[derive(Debug, Clone)]
pub struct ThreadRef {
    seq: ThreadSeq,
    name: Arc<str>,
}

impl ThreadRef {
    /// Create a reference from a registration number and a display name
    pub fn new(seq: ThreadSeq, name: impl Into<Arc<str>>) -> Self {
        Self { seq, name: name.into() }
    }

    /// Registration number of the thread
    #[must_use]
    pub fn seq(&self) -> ThreadSeq {
        self.seq
    }

    /// Human-readable thread name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for ThreadRef {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for ThreadRef {}

impl Hash for ThreadRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.seq.hash(state);
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Lifecycle of a tracking service
///
/// States only move forward (`Uninitialized` → `Active` → `Shutdown`). The one
/// way back to `Uninitialized` is single-threaded cleanup, which also throws
/// away every registered thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Tracking has never been started (or was cleaned up)
    Uninitialized = 0,
    /// Births and deaths are being tallied
    Active = 1,
    /// Tallying stopped; new threads are not registered
    Shutdown = 2,
}

impl Status {
    /// Decode a value stored by [`Status::as_u8`]
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Status::Active,
            2 => Status::Shutdown,
            _ => Status::Uninitialized,
        }
    }

    /// Encoding used for atomic storage
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Uninitialized => "uninitialized",
            Status::Active => "active",
            Status::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}

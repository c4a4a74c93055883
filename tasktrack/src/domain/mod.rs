//! Thread identities, tracking states and the crate's error types.
//!
//! A `ThreadRef` names a registered thread without keeping its records alive,
//! so birth records and snapshots can point back at the thread they came from.

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{Status, ThreadRef, ThreadSeq};

pub use errors::{ReportError, TrackingError};

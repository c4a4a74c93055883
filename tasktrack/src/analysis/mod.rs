//! Analysis of collected tracking data
//!
//! Pure logic over copies of the live maps: collection into snapshots,
//! ordering and grouping, and aggregation. Nothing here touches thread-local
//! state or holds a lock longer than one thread's copy.

pub mod aggregation;
pub mod collector;
pub mod comparator;
pub mod snapshot;

pub use aggregation::Aggregation;
pub use collector::Collector;
pub use comparator::{Comparator, ImmediateAction, Selector, SortKey, DEFAULT_SUBGROUPS};
pub use snapshot::{Snapshot, STILL_ALIVE};

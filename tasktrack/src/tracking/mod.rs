//! Per-thread tallying of task births and deaths.
//!
//! ```text
//! post task ──▶ tally_birth_if_active(here!()) ──▶ BirthRecord (birth thread)
//!                                                        │ carried with the task
//! task done ──▶ tally_death_if_active(record, ..) ──▶ DeathTally (death thread)
//! ```

pub mod birth;
pub mod clock;
pub mod death;
pub mod service;
pub mod thread_data;

pub use birth::{BirthKey, BirthRecord};
pub use clock::{ClockSource, CounterClock, SystemClock};
pub use death::DeathTally;
pub use service::{AutoTracking, TrackingService, TRACKING_COMPILED_IN};
pub use thread_data::{BirthMap, CurrentThread, DeathMap, ThreadData};

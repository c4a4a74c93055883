//! # tasktrack - Task Birth and Death Tracking
//!
//! tasktrack records where (call site) and on which thread each unit of work
//! was created, on which thread it finished, how long it waited in a queue and
//! how long it ran. The numbers are kept per thread with almost no locking and
//! can be collected, grouped, sorted and rendered as a text report at any time.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Instrumented Code                           │
//! │      post task: here!()          task done: timestamps          │
//! └───────────────┬─────────────────────────────┬───────────────────┘
//!                 │ tally_birth_if_active       │ tally_completed_run_if_active
//!                 ▼                             ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Tracking (per thread, lock-light)              │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │ BirthRecord  │   │  DeathTally  │   │  ThreadData  │◀─ registry
//! │  │ (birth side) │   │ (death side) │   │  (maps+lock) │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 │ snapshot copies
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Analysis                              │
//! │  Collector ──▶ Comparator (filter, sort, group) ──▶ Aggregation │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 ▼
//!                        Report (plain text)
//! ```
//!
//! ## Module Structure
//!
//! - [`tracking`]: the [`TrackingService`](tracking::TrackingService), its
//!   lifecycle, the thread registry and the per-thread birth/death maps
//! - [`analysis`]: snapshots, the collector, the comparator chain and
//!   aggregations
//! - [`report`]: text rendering of a query over collected snapshots
//! - [`workload`]: a synthetic message-loop workload used by the binary
//! - [`cli`]: command-line argument parsing
//! - [`domain`]: thread references, lifecycle status and error types
//!
//! ## Typical Usage
//!
//! ```
//! use tasktrack::here;
//! use tasktrack::report::render_query;
//! use tasktrack::tracking::TrackingService;
//!
//! let service = TrackingService::new();
//! service.start_tracking(true);
//!
//! let birth = service.tally_birth_if_active(here!());
//! let posted = service.now().unwrap();
//! // ... later, on whichever thread runs the task
//! let started = service.now().unwrap();
//! service.tally_completed_run_if_active(birth.as_ref(), posted, None, started);
//!
//! let report = render_query(&service, "file/count");
//! assert!(report.contains("Life:1"));
//! ```

pub mod analysis;
pub mod cli;
pub mod domain;
pub mod report;
pub mod tracking;
pub mod workload;

pub use tasktrack_common::{here, Location};

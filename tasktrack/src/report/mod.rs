//! Report rendering
//!
//! Turns collected snapshots into a plain-text report: overall totals, then one
//! block per group with its header, its rows and a subtotal line.

pub mod text_report;

pub use text_report::{
    render_query, render_totals_and_subtotals, save_report, write_help, write_snapshot,
    write_sort_grouping,
};

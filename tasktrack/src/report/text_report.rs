//! Plain-text tracking report
//!
//! ```text
//! Aggregate stats for all tasks:
//! 4 Locations. All born in src/workload.rs. 3 BirthingThreads. ...
//! ================================================================
//! All born in src/workload.rs
//!
//! Life:1, Run:2ms(2ms/life) Queue:0ms(0ms/life) Loop-0->Loop-1 src/workload.rs[88] ...
//!
//! 2 Locations. All born in src/workload.rs. ... (subtotal)
//! ----------------------------------------------------------------
//! ```

#![allow(clippy::format_push_string)]

use std::path::Path;

use crate::analysis::{Aggregation, Collector, Comparator, ImmediateAction, Selector, Snapshot};
use crate::domain::ReportError;
use crate::tracking::TrackingService;

const GROUP_RULE: &str =
    "================================================================";
const SUBTOTAL_RULE: &str =
    "----------------------------------------------------------------";

/// Render a sorted, filtered collection: overall totals, then each group.
///
/// `snapshots` must already be sorted by `comparator` so that every group is
/// contiguous.
#[must_use]
pub fn render_totals_and_subtotals(snapshots: &[Snapshot], comparator: &Comparator) -> String {
    let mut output = String::new();
    if snapshots.is_empty() {
        output.push_str("There were no tracked matches.\n");
        return output;
    }

    let mut totals = Aggregation::new();
    for snapshot in snapshots {
        totals.add_death_snapshot(snapshot);
    }
    output.push_str("Aggregate stats for all tasks:\n");
    output.push_str(&format!("{totals}\n"));
    output.push_str(&format!("{GROUP_RULE}\n"));

    let mut subtotals = Aggregation::new();
    for (i, snapshot) in snapshots.iter().enumerate() {
        let starts_group = i == 0 || !comparator.equivalent(&snapshots[i - 1], snapshot);
        if starts_group && write_sort_grouping(snapshot, comparator, &mut output) {
            output.push_str("\n\n");
        }

        write_snapshot(snapshot, comparator, &mut output);
        output.push('\n');
        subtotals.add_death_snapshot(snapshot);

        let ends_group = snapshots
            .get(i + 1)
            .map_or(true, |next| !comparator.equivalent(snapshot, next));
        if ends_group {
            output.push_str(&format!("\n{subtotals}\n{SUBTOTAL_RULE}\n"));
            subtotals.clear();
        }
    }
    output
}

/// Write the attributes every member of `sample`'s group shares.
///
/// Returns whether anything was written; lines and numeric keys never are.
pub fn write_sort_grouping(sample: &Snapshot, comparator: &Comparator, output: &mut String) -> bool {
    let mut wrote = false;
    for selector in comparator.grouping_selectors() {
        let location = sample.birth().location();
        let phrase = match selector {
            Selector::BirthThread => format!("All new on {}", sample.birth_thread()),
            Selector::DeathThread => format!("All deleted on {}", sample.death_thread_name()),
            Selector::BirthFile => format!("All born in {}", location.file()),
            Selector::BirthFunction => format!("All created in {}", location.function()),
            _ => continue,
        };
        if wrote {
            output.push(' ');
        }
        output.push_str(&phrase);
        wrote = true;
    }
    wrote
}

/// Write one row, leaving out what the group header already says.
pub fn write_snapshot(sample: &Snapshot, comparator: &Comparator, output: &mut String) {
    output.push_str(&sample.death_data().to_string());

    let by_birth = comparator.is_grouped_by(Selector::BirthThread);
    let by_death = comparator.is_grouped_by(Selector::DeathThread);
    if !(by_birth && by_death) {
        let birth = if by_birth { "*" } else { sample.birth_thread().name() };
        let death = if by_death { "*" } else { sample.death_thread_name() };
        output.push_str(&format!("{birth}->{death} "));
    }

    let location = sample.birth().location();
    if !comparator.is_grouped_by(Selector::BirthFile) {
        output.push_str(&format!("{}[{}] ", location.file(), location.line()));
    }
    if !comparator.is_grouped_by(Selector::BirthFunction) {
        output.push_str(location.function());
    }
    let trimmed = output.trim_end().len();
    output.truncate(trimmed);
}

/// Append the list of query keywords.
pub fn write_help(output: &mut String) {
    output.push_str("Query keywords (join with '/', add =VALUE to filter):\n");
    for selector in Selector::ALL {
        output.push_str(&format!("  {:<20}{}\n", selector.keyword(), selector.description()));
    }
    output.push_str(&format!("  {:<20}{}\n", "reset", "zero all counters after this report"));
}

/// Collect everything `service` has tallied and render it for `query`.
///
/// A `reset` in the query clears the counters once they have been collected,
/// so the report still shows the values being discarded.
#[must_use]
pub fn render_query(service: &TrackingService, query: &str) -> String {
    let mut comparator = Comparator::new();
    let actions = comparator.parse_query(query);

    let mut collector = Collector::collect(service);
    collector.add_list_of_living_objects();

    for action in actions {
        match action {
            ImmediateAction::ResetAllData => service.reset_all_thread_data(),
        }
    }

    let mut rows: Vec<Snapshot> =
        collector.into_collection().into_iter().filter(|s| comparator.acceptable(s)).collect();
    comparator.sort(&mut rows);

    let query = if query.trim().is_empty() { "<none>" } else { query.trim() };
    let mut output = format!(
        "Task tracking report (status: {}, query: {query}, {} rows)\n\n",
        service.status(),
        rows.len()
    );
    output.push_str(&render_totals_and_subtotals(&rows, &comparator));
    output.push('\n');
    write_help(&mut output);
    output
}

/// Write a rendered report to `path`.
///
/// # Errors
///
/// Returns [`ReportError::WriteFailed`] when the file cannot be written.
pub fn save_report(path: &Path, report: &str) -> Result<(), ReportError> {
    std::fs::write(path, report)
        .map_err(|source| ReportError::WriteFailed { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ThreadRef, ThreadSeq};
    use crate::tracking::{BirthRecord, DeathTally};
    use std::sync::Arc;
    use std::time::Duration;
    use tasktrack_common::Location;

    fn snap(file: &'static str, line: u32, birth: &str, death: Option<&str>) -> Snapshot {
        let record = Arc::new(BirthRecord::new(
            Location::new(file, "demo::post", line),
            ThreadRef::new(ThreadSeq(0), birth),
        ));
        match death {
            Some(name) => {
                let mut tally = DeathTally::new();
                tally.record_death(Duration::from_millis(1), Duration::from_millis(3));
                Snapshot::new(record, ThreadRef::new(ThreadSeq(1), name), tally)
            }
            None => Snapshot::still_alive(record, 2),
        }
    }

    #[test]
    fn test_empty_collection() {
        let text = render_totals_and_subtotals(&[], &Comparator::new());
        assert_eq!(text, "There were no tracked matches.\n");
    }

    #[test]
    fn test_snapshot_row_hides_grouped_fields() {
        let sample = snap("a.rs", 4, "UI", Some("IO"));

        let mut plain = String::new();
        write_snapshot(&sample, &Comparator::new(), &mut plain);
        assert_eq!(plain, "Life:1, Run:3ms(3ms/life) Queue:1ms(1ms/life) UI->IO a.rs[4] demo::post");

        let mut cmp = Comparator::new();
        cmp.parse_query("birth/file");
        let mut grouped = String::new();
        write_snapshot(&sample, &cmp, &mut grouped);
        assert!(grouped.ends_with("*->IO demo::post"));
    }

    #[test]
    fn test_sort_grouping_header() {
        let mut cmp = Comparator::new();
        cmp.parse_query("death/function/line");
        let mut header = String::new();
        assert!(write_sort_grouping(&snap("a.rs", 4, "UI", None), &cmp, &mut header));
        assert_eq!(header, "All deleted on Still_Alive All created in demo::post");

        let mut none = String::new();
        assert!(!write_sort_grouping(&snap("a.rs", 4, "UI", None), &Comparator::new(), &mut none));
        assert!(none.is_empty());
    }

    #[test]
    fn test_one_subtotal_per_group() {
        let mut cmp = Comparator::new();
        cmp.parse_query("file");
        let mut rows = vec![
            snap("a.rs", 1, "UI", Some("IO")),
            snap("b.rs", 1, "UI", Some("IO")),
            snap("a.rs", 2, "UI", None),
        ];
        cmp.sort(&mut rows);

        let text = render_totals_and_subtotals(&rows, &cmp);
        assert!(text.starts_with("Aggregate stats for all tasks:\n3 Locations. 2 Files. "));
        assert_eq!(text.matches(SUBTOTAL_RULE).count(), 2);
        assert_eq!(text.matches("All born in a.rs\n").count(), 1);
        assert_eq!(text.matches("All born in b.rs\n").count(), 1);
    }

    #[test]
    fn test_save_report_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.txt");
        save_report(&path, "hello").expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "hello");

        let missing = dir.path().join("no/such/dir/report.txt");
        let err = save_report(&missing, "x").expect_err("parent missing");
        assert!(err.to_string().contains("report.txt"));
    }
}

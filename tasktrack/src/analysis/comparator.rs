//! Multi-key ordering, grouping and filtering of snapshots.
//!
//! A [`Comparator`] is a chain of sort keys. Keys added with
//! [`Comparator::set_tiebreaker`] are *grouping* keys: snapshots that agree on
//! all of them are aggregated together, and a grouping key may carry a required
//! value that filters snapshots out. Keys added with
//! [`Comparator::set_subgroup_tiebreaker`] only order rows inside a group.
//!
//! Grouping keys always come before subgroup keys, so sorting places every
//! group in one contiguous run.
//!
//! Queries are plain text, e.g. `birth=UI/file/count`:
//!
//! | keyword              | selector                      |
//! |----------------------|-------------------------------|
//! | `birth`              | thread the work was posted on |
//! | `death`              | thread the work ran on        |
//! | `file`               | source file of the post site  |
//! | `function`           | function of the post site     |
//! | `line`               | line of the post site         |
//! | `count`              | completions (or live births)  |
//! | `duration`           | average run time              |
//! | `totalduration`      | total run time                |
//! | `queueduration`      | average queueing time         |
//! | `totalqueueduration` | total queueing time           |
//! | `reset`              | zero all counters (action)    |

use std::cmp::Ordering;

use log::debug;

use super::snapshot::Snapshot;

/// Attribute of a [`Snapshot`] that can order, group or filter it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    BirthThread,
    DeathThread,
    BirthFile,
    BirthFunction,
    BirthLine,
    Count,
    AverageRunDuration,
    TotalRunDuration,
    AverageQueueDuration,
    TotalQueueDuration,
}

impl Selector {
    pub const ALL: [Selector; 10] = [
        Selector::BirthThread,
        Selector::DeathThread,
        Selector::BirthFile,
        Selector::BirthFunction,
        Selector::BirthLine,
        Selector::Count,
        Selector::AverageRunDuration,
        Selector::TotalRunDuration,
        Selector::AverageQueueDuration,
        Selector::TotalQueueDuration,
    ];

    /// Bit of this selector in [`Comparator::combined_selectors`]
    #[must_use]
    pub fn bit(self) -> u32 {
        1 << self as u32
    }

    /// Query keyword naming this selector
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Selector::BirthThread => "birth",
            Selector::DeathThread => "death",
            Selector::BirthFile => "file",
            Selector::BirthFunction => "function",
            Selector::BirthLine => "line",
            Selector::Count => "count",
            Selector::AverageRunDuration => "duration",
            Selector::TotalRunDuration => "totalduration",
            Selector::AverageQueueDuration => "queueduration",
            Selector::TotalQueueDuration => "totalqueueduration",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Selector::BirthThread => "thread the work was posted on",
            Selector::DeathThread => "thread the work ran on",
            Selector::BirthFile => "source file of the post site",
            Selector::BirthFunction => "function of the post site",
            Selector::BirthLine => "line of the post site",
            Selector::Count => "completions, or births still alive",
            Selector::AverageRunDuration => "average run time",
            Selector::TotalRunDuration => "total run time",
            Selector::AverageQueueDuration => "average queueing time",
            Selector::TotalQueueDuration => "total queueing time",
        }
    }

    /// Look up a keyword, ignoring ASCII case
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Selector> {
        Selector::ALL.into_iter().find(|selector| selector.keyword().eq_ignore_ascii_case(word))
    }

    /// Whether the selector reads text (sorted ascending) rather than a number
    /// (sorted largest first)
    #[must_use]
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Selector::BirthThread
                | Selector::DeathThread
                | Selector::BirthFile
                | Selector::BirthFunction
                | Selector::BirthLine
        )
    }

    /// Order two snapshots by this attribute alone. `Less` sorts `left` first.
    #[must_use]
    pub fn compare(self, left: &Snapshot, right: &Snapshot) -> Ordering {
        match self {
            Selector::BirthThread => {
                let (l, r) = (left.birth_thread(), right.birth_thread());
                l.name().cmp(r.name()).then_with(|| l.seq().cmp(&r.seq()))
            }
            Selector::DeathThread => left
                .death_thread_name()
                .cmp(right.death_thread_name())
                .then_with(|| {
                    let seq = |s: &Snapshot| s.death_thread().map(|t| t.seq());
                    seq(left).cmp(&seq(right))
                }),
            Selector::BirthFile => {
                left.birth().location().file().cmp(right.birth().location().file())
            }
            Selector::BirthFunction => {
                left.birth().location().function().cmp(right.birth().location().function())
            }
            Selector::BirthLine => {
                left.birth().location().line().cmp(&right.birth().location().line())
            }
            Selector::Count => right.count().cmp(&left.count()),
            Selector::AverageRunDuration => right
                .death_data()
                .average_run_duration()
                .cmp(&left.death_data().average_run_duration()),
            Selector::TotalRunDuration => {
                right.death_data().run_duration().cmp(&left.death_data().run_duration())
            }
            Selector::AverageQueueDuration => right
                .death_data()
                .average_queue_duration()
                .cmp(&left.death_data().average_queue_duration()),
            Selector::TotalQueueDuration => {
                right.death_data().queue_duration().cmp(&left.death_data().queue_duration())
            }
        }
    }

    /// Whether `sample` satisfies a required value for this selector.
    ///
    /// Thread, file and function match by substring; the line must parse and
    /// match exactly. Numeric selectors accept everything.
    #[must_use]
    pub fn matches(self, sample: &Snapshot, required: &str) -> bool {
        let location = sample.birth().location();
        match self {
            Selector::BirthThread => sample.birth_thread().name().contains(required),
            Selector::DeathThread => sample.death_thread_name().contains(required),
            Selector::BirthFile => location.file().contains(required),
            Selector::BirthFunction => location.function().contains(required),
            Selector::BirthLine => {
                required.trim().parse::<u32>().map_or(true, |line| line == location.line())
            }
            _ => true,
        }
    }
}

/// Side effect requested by a query rather than an ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateAction {
    /// Zero every counter on every thread
    ResetAllData,
}

const RESET_KEYWORD: &str = "reset";

/// Subgroup order appended to every parsed query
pub const DEFAULT_SUBGROUPS: [Selector; 7] = [
    Selector::Count,
    Selector::AverageRunDuration,
    Selector::BirthThread,
    Selector::DeathThread,
    Selector::BirthFunction,
    Selector::BirthFile,
    Selector::BirthLine,
];

/// One link of the comparator chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub selector: Selector,
    /// Filter value, grouping keys only
    pub required: Option<String>,
    /// Orders rows inside a group without splitting groups
    pub subgroup_only: bool,
}

/// Ordered chain of sort keys with grouping and filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparator {
    keys: Vec<SortKey>,
    combined_selectors: u32,
}

impl Comparator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The chain, grouping keys first
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Bits of every grouping selector
    #[must_use]
    pub fn combined_selectors(&self) -> u32 {
        self.combined_selectors
    }

    #[must_use]
    pub fn is_grouped_by(&self, selector: Selector) -> bool {
        self.combined_selectors & selector.bit() != 0
    }

    /// Grouping selectors in chain order
    pub fn grouping_selectors(&self) -> impl Iterator<Item = Selector> + '_ {
        self.grouping_keys().map(|key| key.selector)
    }

    fn grouping_keys(&self) -> impl Iterator<Item = &SortKey> + '_ {
        self.keys.iter().filter(|key| !key.subgroup_only)
    }

    /// Add `selector` as the least significant grouping key.
    ///
    /// An empty `required` means no filter. Ignored when the selector already
    /// groups; a subgroup key on the same selector is promoted.
    pub fn set_tiebreaker(&mut self, selector: Selector, required: &str) {
        if self.is_grouped_by(selector) {
            return;
        }
        self.keys.retain(|key| key.selector != selector);
        let position = self.keys.iter().position(|key| key.subgroup_only).unwrap_or(self.keys.len());
        let required = (!required.is_empty()).then(|| required.to_owned());
        self.keys.insert(position, SortKey { selector, required, subgroup_only: false });
        self.combined_selectors |= selector.bit();
    }

    /// Add `selector` as the least significant in-group ordering key.
    /// Ignored when the selector is anywhere in the chain.
    pub fn set_subgroup_tiebreaker(&mut self, selector: Selector) {
        if self.keys.iter().any(|key| key.selector == selector) {
            return;
        }
        self.keys.push(SortKey { selector, required: None, subgroup_only: true });
    }

    /// Full ordering: the first key that tells the two apart decides.
    #[must_use]
    pub fn compare(&self, left: &Snapshot, right: &Snapshot) -> Ordering {
        self.keys
            .iter()
            .map(|key| key.selector.compare(left, right))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Strict "sorts before"
    #[must_use]
    pub fn less(&self, left: &Snapshot, right: &Snapshot) -> bool {
        self.compare(left, right).is_lt()
    }

    /// Whether the two belong to the same group. Subgroup keys are ignored.
    #[must_use]
    pub fn equivalent(&self, left: &Snapshot, right: &Snapshot) -> bool {
        self.grouping_keys().all(|key| key.selector.compare(left, right).is_eq())
    }

    /// Whether `sample` meets every required value of the grouping keys.
    #[must_use]
    pub fn acceptable(&self, sample: &Snapshot) -> bool {
        self.grouping_keys().all(|key| {
            key.required.as_deref().map_or(true, |required| key.selector.matches(sample, required))
        })
    }

    /// Stable sort by the full chain.
    pub fn sort(&self, snapshots: &mut [Snapshot]) {
        snapshots.sort_by(|left, right| self.compare(left, right));
    }

    /// Apply one `keyword[=required]` phrase.
    ///
    /// Unknown keywords are skipped. `reset` is handed back to the caller to
    /// execute instead of becoming a key.
    pub fn parse_keyphrase(&mut self, phrase: &str) -> Option<ImmediateAction> {
        let (keyword, required) = phrase.split_once('=').unwrap_or((phrase, ""));
        let keyword = keyword.trim();
        if keyword.eq_ignore_ascii_case(RESET_KEYWORD) {
            return Some(ImmediateAction::ResetAllData);
        }
        match Selector::from_keyword(keyword) {
            Some(selector) => self.set_tiebreaker(selector, required.trim()),
            None => debug!("Ignoring unknown keyphrase {phrase:?}"),
        }
        None
    }

    /// Apply every phrase of `query`, then the default subgroup order.
    ///
    /// Phrases are separated by `/` or `&`; a leading `?` is ignored. Returns
    /// the immediate actions found, in query order.
    pub fn parse_query(&mut self, query: &str) -> Vec<ImmediateAction> {
        let query = query.trim().trim_start_matches('?');
        let actions = query
            .split(['/', '&'])
            .filter(|phrase| !phrase.trim().is_empty())
            .filter_map(|phrase| self.parse_keyphrase(phrase))
            .collect();
        for selector in DEFAULT_SUBGROUPS {
            self.set_subgroup_tiebreaker(selector);
        }
        actions
    }
}

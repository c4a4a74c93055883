use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tasktrack::analysis::{Comparator, Selector, Snapshot};
use tasktrack::domain::{ThreadRef, ThreadSeq};
use tasktrack::tracking::{BirthRecord, DeathTally};
use tasktrack::Location;

const FILES: [&str; 3] = ["src/a.rs", "src/b.rs", "src/c.rs"];
const FUNCTIONS: [&str; 3] = ["app::open", "app::read", "app::close"];
const THREADS: [&str; 3] = ["UI", "IO", "DB"];

#[derive(Debug, Clone)]
struct RowParams {
    file: usize,
    function: usize,
    line: u32,
    birth_thread: usize,
    death_thread: Option<usize>,
    deaths: Vec<(u64, u64)>,
    alive: u64,
}

fn thread(index: usize) -> ThreadRef {
    ThreadRef::new(ThreadSeq(u32::try_from(index).unwrap()), THREADS[index])
}

fn build(params: &RowParams) -> Snapshot {
    let record = Arc::new(BirthRecord::new(
        Location::new(FILES[params.file], FUNCTIONS[params.function], params.line),
        thread(params.birth_thread),
    ));
    match params.death_thread {
        Some(index) => {
            let mut tally = DeathTally::new();
            for &(queue_ms, run_ms) in &params.deaths {
                tally.record_death(Duration::from_millis(queue_ms), Duration::from_millis(run_ms));
            }
            Snapshot::new(record, thread(index), tally)
        }
        None => Snapshot::still_alive(record, params.alive),
    }
}

fn sample() -> impl Strategy<Value = Snapshot> {
    (
        0..FILES.len(),
        0..FUNCTIONS.len(),
        1u32..4,
        0..THREADS.len(),
        prop::option::of(0..THREADS.len()),
        prop::collection::vec((0u64..20, 0u64..20), 0..4),
        0u64..4,
    )
        .prop_map(|(file, function, line, birth_thread, death_thread, deaths, alive)| {
            build(&RowParams { file, function, line, birth_thread, death_thread, deaths, alive })
        })
}

/// Random chain of grouping and subgroup keys
fn comparator() -> impl Strategy<Value = Comparator> {
    prop::collection::vec((0..Selector::ALL.len(), any::<bool>()), 0..8).prop_map(|keys| {
        let mut comparator = Comparator::new();
        for (index, subgroup) in keys {
            let selector = Selector::ALL[index];
            if subgroup {
                comparator.set_subgroup_tiebreaker(selector);
            } else {
                comparator.set_tiebreaker(selector, "");
            }
        }
        comparator
    })
}

proptest! {
    #[test]
    fn prop_less_is_transitive(
        cmp in comparator(),
        a in sample(),
        b in sample(),
        c in sample(),
    ) {
        if cmp.less(&a, &b) && cmp.less(&b, &c) {
            prop_assert!(cmp.less(&a, &c));
        }
        prop_assert!(!cmp.less(&a, &a));
        prop_assert_eq!(cmp.compare(&a, &b), cmp.compare(&b, &a).reverse());
    }

    #[test]
    fn prop_equivalence_is_transitive(
        cmp in comparator(),
        a in sample(),
        b in sample(),
        c in sample(),
    ) {
        if cmp.equivalent(&a, &b) && cmp.equivalent(&b, &c) {
            prop_assert!(cmp.equivalent(&a, &c));
        }
    }

    #[test]
    fn prop_sorting_keeps_groups_adjacent(
        cmp in comparator(),
        mut rows in prop::collection::vec(sample(), 0..24),
    ) {
        cmp.sort(&mut rows);
        for i in 0..rows.len() {
            for j in i + 1..rows.len() {
                if cmp.equivalent(&rows[i], &rows[j]) {
                    for between in &rows[i..=j] {
                        prop_assert!(cmp.equivalent(&rows[i], between));
                    }
                }
            }
        }
        for pair in rows.windows(2) {
            prop_assert!(!cmp.less(&pair[1], &pair[0]));
        }
    }

    #[test]
    fn prop_unknown_keyphrases_are_ignored(
        known in prop::collection::vec(0..Selector::ALL.len(), 0..5),
        junk in prop::collection::vec("[a-z]{1,8}", 0..5),
    ) {
        let known: Vec<&str> = known.into_iter().map(|i| Selector::ALL[i].keyword()).collect();
        let junk: Vec<String> = junk
            .into_iter()
            .filter(|word| Selector::from_keyword(word).is_none() && word != "reset")
            .map(|word| format!("{word}=x"))
            .collect();

        let mut mixed_query: Vec<String> = known.iter().map(|k| (*k).to_owned()).collect();
        for (i, word) in junk.into_iter().enumerate() {
            mixed_query.insert(i.min(mixed_query.len()), word);
        }

        let mut clean = Comparator::new();
        prop_assert!(clean.parse_query(&known.join("/")).is_empty());
        let mut noisy = Comparator::new();
        prop_assert!(noisy.parse_query(&mixed_query.join("/")).is_empty());
        prop_assert_eq!(clean, noisy);
    }
}

#[test]
fn test_garbage_queries_do_not_panic() {
    for query in ["", "/", "//&&", "?", "=", "==x", "birth==", "ÿ/ü=ß", "line=-1", "count=abc"] {
        let mut cmp = Comparator::new();
        let actions = cmp.parse_query(query);
        assert!(actions.is_empty(), "{query:?}");
    }
}

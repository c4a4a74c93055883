#![cfg(feature = "tracking")]

use std::sync::Arc;
use std::time::Duration;

use tasktrack::tracking::{BirthKey, TrackingService};
use tasktrack::Location;

const POST_A: Location = Location::new("src/app.rs", "app::post_a", 10);
const POST_B: Location = Location::new("src/app.rs", "app::post_b", 20);

fn active_service() -> TrackingService {
    let service = TrackingService::new();
    assert!(service.start_tracking(true));
    service
}

#[test]
fn test_births_counted_per_location() {
    let service = active_service();
    for _ in 0..7 {
        service.tally_birth_if_active(POST_A);
    }

    let births = service.get_current().expect("registered").snapshot_births();
    assert_eq!(births.len(), 1);
    assert_eq!(births[&POST_A].birth_count(), 7);
}

#[test]
fn test_locations_do_not_interfere() {
    let service = active_service();
    let a = service.tally_birth_if_active(POST_A);
    service.tally_birth_if_active(POST_B);
    service.tally_birth_if_active(POST_B);
    service.tally_death_if_active(a.as_ref(), Duration::ZERO, Duration::from_millis(4));

    let thread = service.get_current().expect("registered");
    let births = thread.snapshot_births();
    assert_eq!(births[&POST_A].birth_count(), 1);
    assert_eq!(births[&POST_B].birth_count(), 2);

    let deaths = thread.snapshot_deaths();
    assert_eq!(deaths.len(), 1);
    assert!(deaths.keys().all(|key| key.record().location() == POST_A));
}

#[test]
fn test_snapshots_reflect_prior_tallies() {
    let service = active_service();

    service.tally_birth_if_active(POST_A);
    let thread = service.get_current().expect("registered");
    let births = thread.snapshot_births();
    assert_eq!(births.len(), 1);
    assert_eq!(births[&POST_A].birth_count(), 1);

    let second = service.tally_birth_if_active(POST_A);
    service.tally_death_if_active(second.as_ref(), Duration::ZERO, Duration::ZERO);

    assert_eq!(thread.snapshot_births()[&POST_A].birth_count(), 2);
    let deaths = thread.snapshot_deaths();
    assert_eq!(deaths.len(), 1);
    assert_eq!(deaths.values().next().map(|tally| tally.count()), Some(1));
}

#[test]
fn test_death_keyed_by_returned_birth() {
    let service = active_service();
    let birth = service.tally_birth_if_active(POST_A).expect("active");
    service.tally_death_if_active(Some(&birth), Duration::ZERO, Duration::ZERO);

    let thread = service.get_current().expect("registered");
    let births = thread.snapshot_births();
    let deaths = thread.snapshot_deaths();
    let key = deaths.keys().next().expect("one death");

    assert!(Arc::ptr_eq(key.record(), &births[&POST_A]));
    assert!(Arc::ptr_eq(key.record(), &birth));
    assert_eq!(*key, BirthKey::new(birth));
}

#[test]
fn test_reset_zeroes_every_thread() {
    let service = active_service();
    let birth = service.tally_birth_if_active(POST_A);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            service.tally_birth_if_active(POST_B);
            service.tally_death_if_active(birth.as_ref(), Duration::from_millis(1), Duration::from_millis(2));
        });
    });

    service.reset_all_thread_data();

    let threads = service.threads();
    assert_eq!(threads.len(), 2);
    for thread in threads {
        assert!(thread.snapshot_births().values().all(|record| record.birth_count() == 0));
        assert!(thread
            .snapshot_deaths()
            .values()
            .all(|tally| tally.count() == 0 && tally.run_duration().is_zero()));
    }
}

#[test]
fn test_null_birth_handle_is_ignored() {
    let service = active_service();
    service.tally_death_if_active(None, Duration::from_millis(1), Duration::from_millis(1));
    assert!(service.first().is_none(), "a no-op death registers nothing");
}

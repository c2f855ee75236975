//! Patron sync status specs
//!
//! Two workers coordinate per-(patron, collection) syncs through the store.

use crate::prelude::*;
use circ_core::coordination::collections_ready_for_sync;

fn status_for(harness: &Harness, task_id: &str) -> SyncStatus {
    SyncStatus::new(
        harness.store(),
        harness.clock.clone(),
        &harness.namespace(),
        &patron("p-1"),
        &collection("c-1"),
        task_id,
        harness.services.config.sync.clone(),
    )
}

#[test]
fn a_sync_runs_once_while_its_status_lives() {
    let harness = Harness::new();
    let ours = status_for(&harness, "task-1");
    let duplicate = status_for(&harness, "task-2");

    assert!(ours.lock().unwrap());
    assert!(!duplicate.lock().unwrap());

    assert!(ours.success().unwrap());
    // SUCCESS keeps the duplicate out until the window lapses
    assert!(!duplicate.lock().unwrap());
}

#[test]
fn success_window_lapses_into_a_fresh_sync() {
    let harness = Harness::new();
    let first = status_for(&harness, "task-1");

    assert!(first.lock().unwrap());
    assert!(first.success().unwrap());

    harness
        .clock
        .advance(harness.services.config.sync.success + Duration::from_secs(1));

    let next = status_for(&harness, "task-2");
    assert!(next.lock().unwrap());
    assert_eq!(next.status().unwrap().unwrap().state, SyncState::Locked);
}

#[test]
fn a_crashed_workers_lock_frees_after_the_locked_window() {
    let harness = Harness::new();
    let crashed = status_for(&harness, "task-1");
    assert!(crashed.lock().unwrap());

    harness
        .clock
        .advance(harness.services.config.sync.locked + Duration::from_secs(1));

    let takeover = status_for(&harness, "task-2");
    assert!(takeover.lock().unwrap());
    assert_eq!(takeover.status().unwrap().unwrap().task_id, "task-2");
}

#[test]
fn a_stale_worker_cannot_clobber_the_takeovers_result() {
    let harness = Harness::new();
    let stale = status_for(&harness, "task-1");
    assert!(stale.lock().unwrap());

    harness
        .clock
        .advance(harness.services.config.sync.locked + Duration::from_secs(1));
    let takeover = status_for(&harness, "task-2");
    assert!(takeover.lock().unwrap());

    // The stale worker finishes late; its result must not land
    assert!(!stale.success().unwrap());
    assert_eq!(takeover.status().unwrap().unwrap().state, SyncState::Locked);
}

#[test]
fn failed_syncs_retry_sooner_than_successful_ones_resync() {
    let harness = Harness::new();
    let failed = status_for(&harness, "task-1");
    assert!(failed.lock().unwrap());
    assert!(failed.fail().unwrap());

    harness
        .clock
        .advance(harness.services.config.sync.failed + Duration::from_secs(1));

    let retry = status_for(&harness, "task-2");
    assert!(retry.lock().unwrap());
}

#[test]
fn clearing_a_terminal_status_forces_a_resync() {
    let harness = Harness::new();
    let first = status_for(&harness, "task-1");
    assert!(first.lock().unwrap());
    assert!(first.success().unwrap());

    // Any worker may clear a terminal status, owner or not
    let janitor = status_for(&harness, "task-9");
    assert!(janitor.clear().unwrap());

    let next = status_for(&harness, "task-2");
    assert!(next.lock().unwrap());
}

#[test]
fn ready_collections_skip_everything_with_a_live_status() {
    let harness = Harness::new();
    let in_flight = status_for(&harness, "task-1");
    assert!(in_flight.lock().unwrap());

    let store = harness.store();
    let candidates = [collection("c-1"), collection("c-2"), collection("c-3")];
    let ready =
        collections_ready_for_sync(&store, &harness.namespace(), &patron("p-1"), &candidates)
            .unwrap();

    assert_eq!(ready, vec![collection("c-2"), collection("c-3")]);
}

#[test]
fn not_supported_is_remembered_longest() {
    let harness = Harness::new();
    let sync = harness.services.config.sync.clone();
    let first = status_for(&harness, "task-1");
    assert!(first.lock().unwrap());
    assert!(first.not_supported().unwrap());

    // Still remembered after the SUCCESS window
    harness.clock.advance(sync.success + Duration::from_secs(1));
    let record = status_for(&harness, "task-2").status().unwrap().unwrap();
    assert_eq!(record.state, SyncState::NotSupported);

    harness
        .clock
        .advance(sync.not_supported + Duration::from_secs(1));
    assert!(status_for(&harness, "task-2").lock().unwrap());
}

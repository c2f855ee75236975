//! Distributed lock specs
//!
//! Two workers sharing one store contend for named locks.

use crate::prelude::*;

fn lock_for(services: &Services, name: &str) -> DistributedLock {
    DistributedLock::new(
        services.store.clone(),
        &services.namespace(),
        name,
        services.tokens.as_ref(),
        services.lock_config(),
    )
}

#[test]
fn one_worker_holds_a_named_lock_at_a_time() {
    let harness = Harness::new();
    let other = harness.sibling("rival");

    let ours = lock_for(&harness.services, "nightly-sweep");
    let theirs = lock_for(&other, "nightly-sweep");

    assert!(ours.acquire().unwrap());
    assert!(!theirs.acquire().unwrap());
    assert!(theirs.is_locked().unwrap());
    assert!(!theirs.is_held_by_us().unwrap());
}

#[test]
fn release_hands_the_lock_to_the_next_worker() {
    let harness = Harness::new();
    let other = harness.sibling("rival");

    let ours = lock_for(&harness.services, "nightly-sweep");
    let theirs = lock_for(&other, "nightly-sweep");

    assert!(ours.acquire().unwrap());
    assert!(ours.release().unwrap());
    assert!(theirs.acquire().unwrap());
}

#[test]
fn ttl_expiry_frees_a_crashed_workers_lock() {
    let harness = Harness::new();
    let other = harness.sibling("rival");
    let config = LockConfig::new().with_ttl(Some(Duration::from_secs(60)));

    let crashed = DistributedLock::new(
        harness.store(),
        &harness.namespace(),
        "nightly-sweep",
        harness.services.tokens.as_ref(),
        config.clone(),
    );
    let takeover = DistributedLock::new(
        harness.store(),
        &harness.namespace(),
        "nightly-sweep",
        other.tokens.as_ref(),
        config,
    );

    assert!(crashed.acquire().unwrap());
    harness.clock.advance(Duration::from_secs(61));
    assert!(takeover.acquire().unwrap());
    assert!(takeover.is_held_by_us().unwrap());
}

#[test]
fn expired_holder_cannot_release_the_new_owners_lock() {
    let harness = Harness::new();
    let other = harness.sibling("rival");
    let config = LockConfig::new().with_ttl(Some(Duration::from_secs(60)));

    let stale = DistributedLock::new(
        harness.store(),
        &harness.namespace(),
        "nightly-sweep",
        harness.services.tokens.as_ref(),
        config.clone(),
    );
    let fresh = DistributedLock::new(
        harness.store(),
        &harness.namespace(),
        "nightly-sweep",
        other.tokens.as_ref(),
        config,
    );

    assert!(stale.acquire().unwrap());
    harness.clock.advance(Duration::from_secs(61));
    assert!(fresh.acquire().unwrap());

    // The stale worker wakes up and tries to clean up after itself
    assert!(!stale.release().unwrap());
    assert!(fresh.is_held_by_us().unwrap());
}

#[test]
fn task_locks_with_the_same_name_contend_across_workers() {
    let harness = Harness::new();
    let other = harness.sibling("rival");

    let ours = TaskLock::new(
        harness.store(),
        &harness.namespace(),
        Some("import::c-1"),
        None,
        harness.services.tokens.as_ref(),
        harness.services.lock_config(),
    )
    .unwrap();
    let theirs = TaskLock::new(
        harness.store(),
        &harness.namespace(),
        Some("import::c-1"),
        None,
        other.tokens.as_ref(),
        other.lock_config(),
    )
    .unwrap();

    assert!(ours.acquire().unwrap());
    assert!(!theirs.acquire().unwrap());
}

#[test]
fn run_locked_skips_the_loser_without_running_its_work() {
    let harness = Harness::new();
    let other = harness.sibling("rival");

    let ours = lock_for(&harness.services, "nightly-sweep");
    let theirs = lock_for(&other, "nightly-sweep");

    assert!(ours.acquire().unwrap());

    let mut ran = false;
    let outcome = theirs
        .run_locked(|| {
            ran = true;
            Ok::<_, circ_core::coordination::LockError>(())
        })
        .unwrap();
    assert!(!outcome.acquired());
    assert!(!ran);
}

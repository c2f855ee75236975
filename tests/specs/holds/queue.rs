//! Hold queue specs
//!
//! End-to-end collection sweeps over the fake hold store.

use crate::prelude::*;

/// One resource with two single-checkout licenses and five staggered holds
fn seed(harness: &Harness) {
    harness.holds.add_resource(
        &collection("c-1"),
        &resource("r-1"),
        vec![LicenseTerm::new(1, 0), LicenseTerm::new(1, 0)],
    );
    let base = harness.clock.now();
    for n in 1..=5 {
        harness.holds.add_hold(Hold::new(
            format!("h-{n}"),
            format!("p-{n}"),
            "r-1",
            base + chrono::Duration::minutes(n),
        ));
    }
}

fn positions(harness: &Harness) -> Vec<(String, Option<u32>)> {
    harness
        .holds
        .holds_for(&resource("r-1"))
        .into_iter()
        .map(|hold| (hold.id.0, hold.position))
        .collect()
}

#[tokio::test]
async fn a_sweep_reserves_the_first_holds_and_queues_the_rest() {
    let harness = Harness::new();
    seed(&harness);
    let engine = HoldQueueEngine::new(&harness.services);

    assert!(engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap());

    assert_eq!(
        positions(&harness),
        vec![
            ("h-1".to_string(), Some(0)),
            ("h-2".to_string(), Some(0)),
            ("h-3".to_string(), Some(1)),
            ("h-4".to_string(), Some(2)),
            ("h-5".to_string(), Some(3)),
        ]
    );

    let ready: Vec<String> = harness
        .analytics
        .events()
        .iter()
        .map(|event| event.patron().0.clone())
        .collect();
    assert_eq!(ready, vec!["p-1", "p-2"]);
    assert_eq!(harness.holds.counters(&resource("r-1")), Some((2, 0)));
}

#[tokio::test]
async fn repeat_sweeps_announce_nothing_new() {
    let harness = Harness::new();
    seed(&harness);
    let engine = HoldQueueEngine::new(&harness.services);

    engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap();
    let announced = harness.analytics.events().len();

    engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap();
    assert_eq!(harness.analytics.events().len(), announced);
}

#[tokio::test]
async fn a_checkout_promotes_the_next_patron_in_line() {
    let harness = Harness::new();
    seed(&harness);
    let engine = HoldQueueEngine::new(&harness.services);
    engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap();

    // p-1 checks out; their hold leaves the queue
    harness.holds.remove_hold(&HoldId::new("h-1"));
    engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap();

    assert_eq!(
        positions(&harness),
        vec![
            ("h-2".to_string(), Some(0)),
            ("h-3".to_string(), Some(0)),
            ("h-4".to_string(), Some(1)),
            ("h-5".to_string(), Some(2)),
        ]
    );
    let last = harness.analytics.events().last().cloned().unwrap();
    assert_eq!(last.patron().0, "p-3");
}

#[tokio::test]
async fn concurrent_sweeps_of_one_collection_do_not_double_run() {
    let harness = Harness::new();
    seed(&harness);
    let rival = harness.sibling("rival");

    // The rival worker's sweep lock is already held
    let held = TaskLock::new(
        rival.store.clone(),
        &rival.namespace(),
        Some("hold-queue::c-1"),
        None,
        rival.tokens.as_ref(),
        rival.lock_config(),
    )
    .unwrap();
    assert!(held.acquire().unwrap());

    let engine = HoldQueueEngine::new(&harness.services);
    assert!(!engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap());
    assert!(harness.analytics.events().is_empty());

    // Once the rival releases, the sweep goes through
    assert!(held.release().unwrap());
    assert!(engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap());
}

#[tokio::test]
async fn sweeps_cover_every_resource_in_the_collection() {
    let harness = Harness::new();
    for n in 1..=3 {
        harness.holds.add_resource(
            &collection("c-1"),
            &resource(&format!("r-{n}")),
            vec![LicenseTerm::new(1, 0)],
        );
        harness.holds.add_hold(Hold::new(
            format!("h-{n}"),
            format!("p-{n}"),
            format!("r-{n}"),
            harness.clock.now(),
        ));
    }

    let mut services = harness.services.clone();
    services.config.holds.batch_size = 2;
    let engine = HoldQueueEngine::new(&services);

    assert!(engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap());
    assert_eq!(harness.analytics.events().len(), 3);
}

//! Reservation expiry specs
//!
//! A reserved hold that lapses unused is reaped and the queue moves on.

use crate::prelude::*;

fn seed(harness: &Harness) {
    harness.holds.add_resource(
        &collection("c-1"),
        &resource("r-1"),
        vec![LicenseTerm::new(1, 0)],
    );
    let base = harness.clock.now();
    for n in 1..=3 {
        harness.holds.add_hold(Hold::new(
            format!("h-{n}"),
            format!("p-{n}"),
            "r-1",
            base + chrono::Duration::minutes(n),
        ));
    }
}

#[tokio::test]
async fn an_unused_reservation_lapses_and_the_queue_moves_on() {
    let harness = Harness::new();
    seed(&harness);
    let engine = HoldQueueEngine::new(&harness.services);
    engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap();

    // p-1 never checks out; the reservation window passes
    let period = harness.services.config.holds.reservation_period;
    harness.clock.advance(period + Duration::from_secs(1));

    let reaped = engine.reap_expired(&collection("c-1")).await.unwrap();
    assert_eq!(reaped.len(), 1);
    assert_eq!(reaped[0].name(), "hold:expired");
    assert_eq!(reaped[0].patron().0, "p-1");
    assert!(harness.holds.hold(&HoldId::new("h-1")).is_none());

    engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap();
    let ready = harness.holds.hold(&HoldId::new("h-2")).unwrap();
    assert_eq!(ready.position, Some(0));
}

#[tokio::test]
async fn waiting_holds_survive_the_reaper() {
    let harness = Harness::new();
    seed(&harness);
    let engine = HoldQueueEngine::new(&harness.services);
    engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap();

    let period = harness.services.config.holds.reservation_period;
    harness.clock.advance(period + Duration::from_secs(1));
    engine.reap_expired(&collection("c-1")).await.unwrap();

    assert!(harness.holds.hold(&HoldId::new("h-2")).is_some());
    assert!(harness.holds.hold(&HoldId::new("h-3")).is_some());
}

#[tokio::test]
async fn fresh_reservations_are_left_alone() {
    let harness = Harness::new();
    seed(&harness);
    let engine = HoldQueueEngine::new(&harness.services);
    engine
        .recalculate_collection(&collection("c-1"))
        .await
        .unwrap();

    let reaped = engine.reap_expired(&collection("c-1")).await.unwrap();
    assert!(reaped.is_empty());
    assert!(harness.holds.hold(&HoldId::new("h-1")).is_some());
}

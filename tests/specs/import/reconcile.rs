//! Import reconciliation specs
//!
//! A paged import job driven by the orchestrator, reconciled at the end.

use crate::prelude::*;
use async_trait::async_trait;
use circ_core::coordination::SetHandle;
use circ_engine::{
    finalize_children, Continuation, ImportReconciler, Job, JobError, Orchestrator, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

const EXPIRY: Duration = Duration::from_secs(3600);

fn isbn(value: &str) -> Identifier {
    Identifier::new("isbn", value)
}

fn feed_item(value: &str) -> (Identifier, serde_json::Value, ResourceId) {
    (
        isbn(value),
        json!({ "identifier": value }),
        ResourceId::new(format!("r-{value}")),
    )
}

#[derive(Clone, Serialize, Deserialize)]
struct WalkArgs {
    page: usize,
    active: SetHandle,
    existing: SetHandle,
}

/// Walks a canned vendor feed page by page through an `ImportReconciler`
struct FeedWalk {
    pages: Vec<Vec<(Identifier, serde_json::Value, ResourceId)>>,
}

#[async_trait]
impl Job for FeedWalk {
    type Args = WalkArgs;

    fn name(&self) -> &'static str {
        "feed-walk"
    }

    async fn run(
        &self,
        services: &Services,
        args: WalkArgs,
    ) -> Result<Continuation<WalkArgs>, JobError> {
        let Some(page) = self.pages.get(args.page) else {
            return Ok(Continuation::Done);
        };
        let reconciler = ImportReconciler::from_handles(services, &args.active, &args.existing);
        reconciler.import_page(page).await?;
        Ok(Continuation::Continue(WalkArgs {
            page: args.page + 1,
            ..args
        }))
    }
}

#[tokio::test]
async fn a_paged_import_reconciles_what_the_vendor_dropped() {
    let harness = Harness::new();
    let reconciler = ImportReconciler::new(&harness.services, &collection("c-1"), EXPIRY);
    reconciler
        .record_existing(&[isbn("a"), isbn("b"), isbn("c")])
        .unwrap();

    let job = FeedWalk {
        pages: vec![
            vec![feed_item("b"), feed_item("d")],
            vec![feed_item("c")],
        ],
    };
    let orchestrator = Orchestrator::new(harness.services.clone());
    orchestrator
        .drive(
            &job,
            WalkArgs {
                page: 0,
                active: reconciler.active_handle(),
                existing: reconciler.existing_handle(),
            },
        )
        .await
        .unwrap();

    let removable = reconciler.finish().unwrap();
    assert_eq!(removable, vec![isbn("a")]);

    // Every feed item crossed the apply boundary exactly once
    assert_eq!(harness.apply.applied().len(), 3);
}

#[tokio::test]
async fn a_transient_apply_conflict_is_retried_and_the_import_completes() {
    let harness = Harness::new();
    harness.apply.fail_times(1);
    let reconciler = ImportReconciler::new(&harness.services, &collection("c-1"), EXPIRY);
    reconciler.record_existing(&[isbn("a")]).unwrap();

    let job = FeedWalk {
        pages: vec![vec![feed_item("a")]],
    };
    let orchestrator = Orchestrator::new(harness.services.clone()).with_retry(RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
    });
    orchestrator
        .drive(
            &job,
            WalkArgs {
                page: 0,
                active: reconciler.active_handle(),
                existing: reconciler.existing_handle(),
            },
        )
        .await
        .unwrap();

    assert!(reconciler.finish().unwrap().is_empty());
}

#[tokio::test]
async fn fanned_out_children_reconcile_through_their_handles() {
    let harness = Harness::new();
    let parent = ImportReconciler::new(&harness.services, &collection("c-1"), EXPIRY);
    parent
        .record_existing(&[isbn("a"), isbn("b"), isbn("c")])
        .unwrap();

    // Two child jobs each walk part of the feed into their own active set
    let namespace = harness.namespace();
    let children: Vec<SetHandle> = ["b", "c"]
        .iter()
        .enumerate()
        .map(|(n, value)| {
            let set = IdentifierSet::new(
                harness.store(),
                &namespace,
                &format!("import::c-1::{n}"),
                EXPIRY,
            );
            set.add(&[isbn(value)]).unwrap();
            set.handle()
        })
        .collect();

    let removable =
        finalize_children(&harness.services, &parent.existing_handle(), &children).unwrap();
    assert_eq!(removable, vec![isbn("a")]);

    // Every set was consumed
    for handle in &children {
        let set = IdentifierSet::from_handle(harness.store(), handle);
        assert!(!set.exists().unwrap());
    }
}

#[tokio::test]
async fn abandoned_run_sets_expire_on_their_own() {
    let harness = Harness::new();
    let reconciler = ImportReconciler::new(&harness.services, &collection("c-1"), EXPIRY);
    reconciler.record_existing(&[isbn("a")]).unwrap();
    reconciler
        .import_page(&[feed_item("a")])
        .await
        .unwrap();

    // The worker dies; nothing calls finish
    harness.clock.advance(EXPIRY + Duration::from_secs(1));

    let active = IdentifierSet::from_handle(harness.store(), &reconciler.active_handle());
    let existing = IdentifierSet::from_handle(harness.store(), &reconciler.existing_handle());
    assert!(!active.exists().unwrap());
    assert!(!existing.exists().unwrap());
}

#[test]
fn set_handles_round_trip_through_serde() {
    let harness = Harness::new();
    let reconciler = ImportReconciler::new(&harness.services, &collection("c-1"), EXPIRY);
    let handle = reconciler.active_handle();

    let raw = serde_json::to_string(&handle).unwrap();
    let parsed: SetHandle = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, handle);

    let reattached = IdentifierSet::from_handle(harness.store(), &parsed);
    reattached.add(&[isbn("a")]).unwrap();
    assert!(reattached.contains(&isbn("a")).unwrap());
}

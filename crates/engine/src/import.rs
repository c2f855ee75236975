// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Import reconciliation over identifier sets
//!
//! A collection import walks the vendor feed page by page: every identifier
//! it applies lands in an `active` set, while an `existing` set snapshots
//! what the catalog held before the run. When the walk finishes,
//! `existing - active` is exactly what the vendor no longer carries and the
//! caller may remove. Chained or fanned-out jobs hand the live sets around
//! as `SetHandle`s instead of re-sending their contents.

use crate::error::EngineError;
use circ_core::coordination::{Identifier, IdentifierSet, SetError, SetHandle};
use circ_core::hold::{CollectionId, ResourceId};
use circ_core::services::Services;
use std::collections::HashSet;
use std::time::Duration;

/// Tracks one import run's `active` and `existing` identifier sets
pub struct ImportReconciler {
    services: Services,
    active: IdentifierSet,
    existing: IdentifierSet,
}

impl ImportReconciler {
    pub fn new(services: &Services, collection: &CollectionId, expiry: Duration) -> Self {
        let namespace = services.namespace();
        Self {
            services: services.clone(),
            active: IdentifierSet::new(
                services.store.clone(),
                &namespace,
                &format!("import::{collection}::active"),
                expiry,
            ),
            existing: IdentifierSet::new(
                services.store.clone(),
                &namespace,
                &format!("import::{collection}::existing"),
                expiry,
            ),
        }
    }

    /// Reattach to a run started by an earlier job in the chain
    pub fn from_handles(services: &Services, active: &SetHandle, existing: &SetHandle) -> Self {
        Self {
            services: services.clone(),
            active: IdentifierSet::from_handle(services.store.clone(), active),
            existing: IdentifierSet::from_handle(services.store.clone(), existing),
        }
    }

    /// Snapshot identifiers already in the catalog before the walk
    pub fn record_existing(&self, items: &[Identifier]) -> Result<usize, EngineError> {
        Ok(self.existing.add(items)?)
    }

    /// Apply one page of imported data and mark its identifiers active
    ///
    /// Each item is applied before its identifier is marked, so a failed
    /// apply never leaves the identifier looking imported.
    pub async fn import_page(
        &self,
        items: &[(Identifier, serde_json::Value, ResourceId)],
    ) -> Result<(), EngineError> {
        for (identifier, data, resource) in items {
            self.services.apply.apply(data, resource).await?;
            self.active.add(std::slice::from_ref(identifier))?;
        }
        Ok(())
    }

    pub fn active_handle(&self) -> SetHandle {
        self.active.handle()
    }

    pub fn existing_handle(&self) -> SetHandle {
        self.existing.handle()
    }

    /// End the run: return `existing - active` and consume both sets
    ///
    /// The sets are deleted even when the diff fails; a half-dead run must
    /// not poison the next one.
    pub fn finish(&self) -> Result<Vec<Identifier>, EngineError> {
        let removable = self.existing.diff(&self.active);
        let cleanup = delete_all([&self.active, &self.existing]);
        let removable = removable?;
        cleanup?;
        Ok(removable)
    }
}

/// Reconcile an `existing` set against the `active` sets of fanned-out
/// child jobs
///
/// The removable identifiers are `existing` minus the union of every
/// child's observations. All handed-over sets are consumed here, diff
/// outcome or not.
pub fn finalize_children(
    services: &Services,
    existing: &SetHandle,
    children: &[SetHandle],
) -> Result<Vec<Identifier>, EngineError> {
    let existing_set = IdentifierSet::from_handle(services.store.clone(), existing);
    let child_sets: Vec<IdentifierSet> = children
        .iter()
        .map(|handle| IdentifierSet::from_handle(services.store.clone(), handle))
        .collect();

    let removable = (|| {
        let mut active: HashSet<Identifier> = HashSet::new();
        for set in &child_sets {
            active.extend(set.get()?);
        }
        existing_set.diff_local(&active)
    })();

    let cleanup = delete_all(child_sets.iter().chain(std::iter::once(&existing_set)));
    let removable = removable?;
    cleanup?;
    Ok(removable)
}

/// Delete every set, keeping the first error until all have been tried
fn delete_all<'a>(sets: impl IntoIterator<Item = &'a IdentifierSet>) -> Result<(), SetError> {
    let mut first = Ok(());
    for set in sets {
        if let Err(error) = set.delete() {
            if first.is_ok() {
                first = Err(error);
            }
        }
    }
    first
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod tests;

//! Fake adapter implementations for testing

use super::traits::*;
use crate::event::CirculationEvent;
use crate::hold::{CollectionId, Hold, HoldId, LicenseTerm, ResourceId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// FakeHoldStore
// =============================================================================

#[derive(Clone, Debug)]
struct FakeResource {
    collection: CollectionId,
    terms: Vec<LicenseTerm>,
    reserved: u32,
    available: u32,
    missing: bool,
}

#[derive(Default)]
struct HoldState {
    resources: BTreeMap<ResourceId, FakeResource>,
    holds: BTreeMap<HoldId, Hold>,
}

/// In-memory hold persistence honoring the `HoldStore` ordering contracts
#[derive(Clone, Default)]
pub struct FakeHoldStore {
    state: Arc<Mutex<HoldState>>,
}

impl FakeHoldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(&self, collection: &CollectionId, resource: &ResourceId, terms: Vec<LicenseTerm>) {
        lock(&self.state).resources.insert(
            resource.clone(),
            FakeResource {
                collection: collection.clone(),
                terms,
                reserved: 0,
                available: 0,
                missing: false,
            },
        );
    }

    /// Simulates a resource deleted mid-sweep
    pub fn remove_resource(&self, resource: &ResourceId) {
        let mut state = lock(&self.state);
        state.resources.remove(resource);
        state.holds.retain(|_, hold| &hold.resource != resource);
    }

    /// Keep the resource listable but make existence checks fail, as if it
    /// were deleted between a page query and the per-resource check
    pub fn mark_missing(&self, resource: &ResourceId) {
        if let Some(r) = lock(&self.state).resources.get_mut(resource) {
            r.missing = true;
        }
    }

    pub fn add_hold(&self, hold: Hold) {
        lock(&self.state).holds.insert(hold.id.clone(), hold);
    }

    pub fn remove_hold(&self, id: &HoldId) {
        lock(&self.state).holds.remove(id);
    }

    pub fn hold(&self, id: &HoldId) -> Option<Hold> {
        lock(&self.state).holds.get(id).cloned()
    }

    /// Current holds for a resource in arrival order
    pub fn holds_for(&self, resource: &ResourceId) -> Vec<Hold> {
        let mut holds: Vec<Hold> = lock(&self.state)
            .holds
            .values()
            .filter(|hold| &hold.resource == resource)
            .cloned()
            .collect();
        holds.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));
        holds
    }

    /// (reserved, available) counters last written for a resource
    pub fn counters(&self, resource: &ResourceId) -> Option<(u32, u32)> {
        lock(&self.state)
            .resources
            .get(resource)
            .map(|r| (r.reserved, r.available))
    }
}

#[async_trait]
impl HoldStore for FakeHoldStore {
    async fn license_terms(&self, resource: &ResourceId) -> Result<Vec<LicenseTerm>, HoldStoreError> {
        lock(&self.state)
            .resources
            .get(resource)
            .map(|r| r.terms.clone())
            .ok_or_else(|| HoldStoreError::ResourceNotFound(resource.clone()))
    }

    async fn active_holds(&self, resource: &ResourceId) -> Result<Vec<Hold>, HoldStoreError> {
        Ok(self.holds_for(resource))
    }

    async fn resources_with_holds(
        &self,
        collection: &CollectionId,
        after: Option<&ResourceId>,
        limit: usize,
    ) -> Result<Vec<ResourceId>, HoldStoreError> {
        let state = lock(&self.state);
        // BTreeMap iteration is already resource-id order
        let mut ids = Vec::new();
        for (id, resource) in state.resources.iter() {
            if resource.collection != *collection {
                continue;
            }
            if !state.holds.values().any(|hold| hold.resource == *id) {
                continue;
            }
            if after.map_or(false, |cursor| id <= cursor) {
                continue;
            }
            ids.push(id.clone());
            if ids.len() == limit {
                break;
            }
        }
        Ok(ids)
    }

    async fn expired_reserved_holds(
        &self,
        collection: &CollectionId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Hold>, HoldStoreError> {
        let state = lock(&self.state);
        let mut expired: Vec<Hold> = state
            .holds
            .values()
            .filter(|hold| {
                hold.is_expired(now)
                    && state
                        .resources
                        .get(&hold.resource)
                        .is_some_and(|r| &r.collection == collection)
            })
            .cloned()
            .collect();
        expired.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(expired)
    }

    async fn update_hold(&self, hold: &Hold) -> Result<(), HoldStoreError> {
        let mut state = lock(&self.state);
        match state.holds.get_mut(&hold.id) {
            Some(existing) => {
                *existing = hold.clone();
                Ok(())
            }
            None => Err(HoldStoreError::HoldNotFound(hold.id.clone())),
        }
    }

    async fn delete_hold(&self, id: &HoldId) -> Result<(), HoldStoreError> {
        match lock(&self.state).holds.remove(id) {
            Some(_) => Ok(()),
            None => Err(HoldStoreError::HoldNotFound(id.clone())),
        }
    }

    async fn update_counters(
        &self,
        resource: &ResourceId,
        reserved: u32,
        available: u32,
    ) -> Result<(), HoldStoreError> {
        let mut state = lock(&self.state);
        match state.resources.get_mut(resource) {
            Some(r) => {
                r.reserved = reserved;
                r.available = available;
                Ok(())
            }
            None => Err(HoldStoreError::ResourceNotFound(resource.clone())),
        }
    }

    async fn resource_exists(&self, resource: &ResourceId) -> Result<bool, HoldStoreError> {
        Ok(lock(&self.state)
            .resources
            .get(resource)
            .is_some_and(|r| !r.missing))
    }

    async fn collection_of(&self, resource: &ResourceId) -> Result<CollectionId, HoldStoreError> {
        lock(&self.state)
            .resources
            .get(resource)
            .map(|r| r.collection.clone())
            .ok_or_else(|| HoldStoreError::ResourceNotFound(resource.clone()))
    }
}

// =============================================================================
// RecordingAnalytics
// =============================================================================

/// Analytics sink recording every dispatched event
#[derive(Clone, Default)]
pub struct RecordingAnalytics {
    events: Arc<Mutex<Vec<CirculationEvent>>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CirculationEvent> {
        lock(&self.events).clone()
    }
}

#[async_trait]
impl AnalyticsSink for RecordingAnalytics {
    async fn dispatch(&self, event: &CirculationEvent) -> Result<(), AnalyticsError> {
        lock(&self.events).push(event.clone());
        Ok(())
    }
}

// =============================================================================
// RecordingApplySink
// =============================================================================

/// Apply sink recording calls, with configurable transient failures
#[derive(Clone, Default)]
pub struct RecordingApplySink {
    applied: Arc<Mutex<Vec<(serde_json::Value, ResourceId)>>>,
    fail_remaining: Arc<Mutex<u32>>,
}

impl RecordingApplySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` apply calls fail with a conflict
    pub fn fail_times(&self, count: u32) {
        *lock(&self.fail_remaining) = count;
    }

    pub fn applied(&self) -> Vec<(serde_json::Value, ResourceId)> {
        lock(&self.applied).clone()
    }
}

#[async_trait]
impl ApplySink for RecordingApplySink {
    async fn apply(
        &self,
        data: &serde_json::Value,
        resource: &ResourceId,
    ) -> Result<(), ApplyError> {
        let mut remaining = lock(&self.fail_remaining);
        if *remaining > 0 {
            *remaining -= 1;
            return Err(ApplyError::Conflict("simulated conflict".to_string()));
        }
        drop(remaining);
        lock(&self.applied).push((data.clone(), resource.clone()));
        Ok(())
    }
}

// =============================================================================
// FakeVendorClient
// =============================================================================

/// Vendor client serving canned availability documents
#[derive(Clone)]
pub struct FakeVendorClient {
    protocol: VendorProtocol,
    documents: Arc<Mutex<BTreeMap<ResourceId, AvailabilityDocument>>>,
    supported: Arc<Mutex<bool>>,
}

impl FakeVendorClient {
    pub fn new(protocol: VendorProtocol) -> Self {
        Self {
            protocol,
            documents: Arc::new(Mutex::new(BTreeMap::new())),
            supported: Arc::new(Mutex::new(true)),
        }
    }

    pub fn stub_availability(&self, document: AvailabilityDocument) {
        lock(&self.documents).insert(document.resource.clone(), document);
    }

    /// Make every call answer `NotSupported`
    pub fn mark_unsupported(&self) {
        *lock(&self.supported) = false;
    }
}

#[async_trait]
impl VendorClient for FakeVendorClient {
    fn protocol(&self) -> VendorProtocol {
        self.protocol.clone()
    }

    async fn availability(
        &self,
        resource: &ResourceId,
    ) -> Result<AvailabilityDocument, VendorError> {
        if !*lock(&self.supported) {
            return Err(VendorError::NotSupported(self.protocol.clone()));
        }
        lock(&self.documents)
            .get(resource)
            .cloned()
            .ok_or_else(|| VendorError::Request(format!("no document for {resource}")))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter trait definitions for external collaborators

use crate::event::CirculationEvent;
use crate::hold::{CollectionId, Hold, HoldId, LicenseTerm, ResourceId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Hold persistence
// =============================================================================

/// Errors from hold persistence operations
#[derive(Debug, Error)]
pub enum HoldStoreError {
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),
    #[error("hold not found: {0}")]
    HoldNotFound(HoldId),
    /// Optimistic-concurrency conflict; retryable
    #[error("concurrent update conflict: {0}")]
    Conflict(String),
    #[error("hold store backend error: {0}")]
    Backend(String),
}

/// Adapter for loan/hold persistence
///
/// Ordering contracts: `active_holds` returns arrival order (start time,
/// tie-broken by hold id); `resources_with_holds` returns resource-id order
/// so sweeps can page deterministically.
#[async_trait]
pub trait HoldStore: Send + Sync {
    /// License terms for a resource
    async fn license_terms(&self, resource: &ResourceId) -> Result<Vec<LicenseTerm>, HoldStoreError>;

    /// Active (non-expired) holds for a resource in arrival order
    async fn active_holds(&self, resource: &ResourceId) -> Result<Vec<Hold>, HoldStoreError>;

    /// One page of resources with at least one hold, ordered by id,
    /// strictly after `after`
    async fn resources_with_holds(
        &self,
        collection: &CollectionId,
        after: Option<&ResourceId>,
        limit: usize,
    ) -> Result<Vec<ResourceId>, HoldStoreError>;

    /// Reserved holds in the collection whose reservation window has lapsed
    async fn expired_reserved_holds(
        &self,
        collection: &CollectionId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Hold>, HoldStoreError>;

    /// Persist a hold's recomputed position/start/end
    async fn update_hold(&self, hold: &Hold) -> Result<(), HoldStoreError>;

    async fn delete_hold(&self, id: &HoldId) -> Result<(), HoldStoreError>;

    /// Update the resource's reserved/available counters
    async fn update_counters(
        &self,
        resource: &ResourceId,
        reserved: u32,
        available: u32,
    ) -> Result<(), HoldStoreError>;

    /// Whether the resource still exists (sweeps tolerate mid-run deletion)
    async fn resource_exists(&self, resource: &ResourceId) -> Result<bool, HoldStoreError>;

    /// The collection a resource belongs to
    async fn collection_of(&self, resource: &ResourceId) -> Result<CollectionId, HoldStoreError>;
}

// =============================================================================
// Analytics
// =============================================================================

/// Errors from the analytics sink
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("analytics dispatch failed: {0}")]
    Dispatch(String),
}

/// Sink accepting typed circulation events with resource/patron context
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn dispatch(&self, event: &CirculationEvent) -> Result<(), AnalyticsError>;
}

// =============================================================================
// Bibliographic apply
// =============================================================================

/// Errors from the apply callback
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Optimistic-concurrency conflict; retryable
    #[error("apply conflict: {0}")]
    Conflict(String),
    #[error("apply failed: {0}")]
    Failed(String),
}

/// Idempotent callback carrying imported data across the core boundary
///
/// Repeated calls with identical data must be safe.
#[async_trait]
pub trait ApplySink: Send + Sync {
    async fn apply(&self, data: &serde_json::Value, resource: &ResourceId)
        -> Result<(), ApplyError>;
}

// =============================================================================
// Vendor clients
// =============================================================================

/// Circulation protocol spoken by a vendor integration
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VendorProtocol {
    Opds,
    Odl,
    Overdrive,
    Boundless,
    /// A protocol this deployment has no client for; kept verbatim so the
    /// registry can report what it saw
    Unknown(String),
}

impl VendorProtocol {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "opds" => VendorProtocol::Opds,
            "odl" => VendorProtocol::Odl,
            "overdrive" => VendorProtocol::Overdrive,
            "boundless" => VendorProtocol::Boundless,
            _ => VendorProtocol::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VendorProtocol::Opds => "opds",
            VendorProtocol::Odl => "odl",
            VendorProtocol::Overdrive => "overdrive",
            VendorProtocol::Boundless => "boundless",
            VendorProtocol::Unknown(raw) => raw,
        }
    }
}

impl std::fmt::Display for VendorProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Availability/license document returned by a vendor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvailabilityDocument {
    pub resource: ResourceId,
    pub terms: Vec<LicenseTerm>,
    pub fetched_at: DateTime<Utc>,
}

/// Errors from vendor operations
#[derive(Debug, Error)]
pub enum VendorError {
    /// Retryable
    #[error("vendor request timed out: {0}")]
    Timeout(String),
    /// Terminal: this integration can't do this; callers stop retrying
    #[error("operation not supported by {0}")]
    NotSupported(VendorProtocol),
    #[error("vendor request failed: {0}")]
    Request(String),
}

/// Protocol-agnostic vendor client
#[async_trait]
pub trait VendorClient: Send + Sync {
    fn protocol(&self) -> VendorProtocol;

    /// Current availability document for a resource
    async fn availability(&self, resource: &ResourceId)
        -> Result<AvailabilityDocument, VendorError>;
}

/// Protocol → client mapping, resolved once at the registry boundary
#[derive(Clone, Default)]
pub struct VendorRegistry {
    clients: HashMap<VendorProtocol, Arc<dyn VendorClient>>,
}

impl VendorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: Arc<dyn VendorClient>) -> Self {
        self.clients.insert(client.protocol(), client);
        self
    }

    /// The client for a protocol; `None` for unknown or unregistered ones
    pub fn client_for(&self, protocol: &VendorProtocol) -> Option<Arc<dyn VendorClient>> {
        self.clients.get(protocol).cloned()
    }
}

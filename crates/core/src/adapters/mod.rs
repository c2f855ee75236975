// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter modules for external collaborators

pub mod fake;
pub mod traits;

// Re-export traits
pub use traits::{
    AnalyticsError, AnalyticsSink, ApplyError, ApplySink, AvailabilityDocument, HoldStore,
    HoldStoreError, VendorClient, VendorError, VendorProtocol, VendorRegistry,
};

// Re-export fake adapters
pub use fake::{FakeHoldStore, FakeVendorClient, RecordingAnalytics, RecordingApplySink};

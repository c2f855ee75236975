// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Circulation events emitted by the hold-queue engine
//!
//! Events are returned by the computation and dispatched by the caller after
//! the surrounding transaction commits, never synchronously from inside the
//! algorithm.

use crate::hold::{CollectionId, PatronId, ResourceId};
use serde::{Deserialize, Serialize};

/// Typed events handed to the analytics sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CirculationEvent {
    /// A hold moved into reserved state and is ready for checkout
    HoldReady {
        collection: CollectionId,
        resource: ResourceId,
        patron: PatronId,
    },
    /// A reserved hold passed its reservation window without being acted on
    HoldExpired {
        collection: CollectionId,
        resource: ResourceId,
        patron: PatronId,
    },
}

impl CirculationEvent {
    /// Stable event name for sinks and log lines
    pub fn name(&self) -> &'static str {
        match self {
            CirculationEvent::HoldReady { .. } => "hold:ready",
            CirculationEvent::HoldExpired { .. } => "hold:expired",
        }
    }

    pub fn patron(&self) -> &PatronId {
        match self {
            CirculationEvent::HoldReady { patron, .. }
            | CirculationEvent::HoldExpired { patron, .. } => patron,
        }
    }

    pub fn resource(&self) -> &ResourceId {
        match self {
            CirculationEvent::HoldReady { resource, .. }
            | CirculationEvent::HoldExpired { resource, .. } => resource,
        }
    }
}

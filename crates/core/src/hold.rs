// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hold and license types shared between the coordination core and the
//! hold-queue engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a patron
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatronId(pub String);

/// Unique identifier for a resource (license pool)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub String);

/// Unique identifier for a collection
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub String);

/// Unique identifier for a hold
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HoldId(pub String);

macro_rules! id_impls {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_impls!(PatronId);
id_impls!(ResourceId);
id_impls!(CollectionId);
id_impls!(HoldId);

/// A patron's place in a resource's hold queue
///
/// Position 0 means the hold is reserved and ready for checkout; 1..N are
/// waiting positions in arrival order; `None` means the position has not been
/// computed yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub id: HoldId,
    pub patron: PatronId,
    pub resource: ResourceId,
    pub position: Option<u32>,
    pub start: DateTime<Utc>,
    /// End of the reservation window; `None` for open-ended waiting holds
    pub end: Option<DateTime<Utc>>,
}

impl Hold {
    pub fn new(
        id: impl Into<String>,
        patron: impl Into<String>,
        resource: impl Into<String>,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HoldId::new(id),
            patron: PatronId::new(patron),
            resource: ResourceId::new(resource),
            position: None,
            start,
            end: None,
        }
    }

    /// Whether this hold currently occupies a reservation slot
    pub fn is_reserved(&self) -> bool {
        self.position == Some(0)
    }

    /// Whether this is a reserved hold whose reservation window has lapsed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_reserved() && matches!(self.end, Some(end) if end < now)
    }
}

/// One license term for a resource: how many concurrent checkouts it allows
/// and how many are currently active
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseTerm {
    pub checkout_limit: u32,
    pub active_checkouts: u32,
}

impl LicenseTerm {
    pub fn new(checkout_limit: u32, active_checkouts: u32) -> Self {
        Self {
            checkout_limit,
            active_checkouts,
        }
    }

    /// Free checkout slots under this term, floored at zero
    pub fn free_slots(&self) -> u32 {
        self.checkout_limit.saturating_sub(self.active_checkouts)
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hold-queue recalculation
//!
//! Positions are a pure function of license availability and hold arrival
//! order: the first `slots` holds by (start, id) are reserved at position 0
//! with a fresh reservation window, the rest wait at positions 1..N with
//! open ends. Reserved starts are kept strictly earlier than the first
//! waiting start so a timestamp sort always reproduces the same FIFO.

use crate::error::EngineError;
use circ_core::adapters::{AnalyticsSink, HoldStore};
use circ_core::clock::{delta, Clock};
use circ_core::coordination::{LockConfig, TaskLock};
use circ_core::event::CirculationEvent;
use circ_core::hold::{CollectionId, Hold, ResourceId};
use circ_core::services::Services;
use std::time::Duration;

pub struct HoldQueueEngine<'a> {
    services: &'a Services,
}

impl<'a> HoldQueueEngine<'a> {
    pub fn new(services: &'a Services) -> Self {
        Self { services }
    }

    /// Recompute positions for one resource's hold queue
    ///
    /// Returns one `HoldReady` event per hold that newly became reserved in
    /// this run. Events are dispatched by the caller after its transaction
    /// commits, never from inside the algorithm.
    pub async fn recalculate(
        &self,
        resource: &ResourceId,
        reservation_period: Duration,
    ) -> Result<Vec<CirculationEvent>, EngineError> {
        let services = self.services;
        let now = services.clock.now();

        let slots: usize = services
            .holds
            .license_terms(resource)
            .await?
            .iter()
            .map(|term| term.free_slots() as usize)
            .sum();

        let mut holds = services.holds.active_holds(resource).await?;
        // Arrival order defines FIFO; enforce it rather than trusting the
        // adapter's ordering
        holds.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));

        let reserved_count = slots.min(holds.len());
        let newly_reserved: Vec<Hold> = holds
            .iter()
            .take(reserved_count)
            .filter(|hold| !hold.is_reserved())
            .cloned()
            .collect();

        let first_waiting_start = holds.get(reserved_count).map(|hold| hold.start);
        let (reserved, waiting) = holds.split_at_mut(reserved_count);

        for (index, hold) in reserved.iter_mut().enumerate() {
            hold.position = Some(0);
            hold.end = Some(now + delta(reservation_period));
            if let Some(waiting_start) = first_waiting_start {
                if hold.start >= waiting_start {
                    let backdate = (reserved_count - index) as i64;
                    hold.start = waiting_start - chrono::Duration::seconds(backdate);
                }
            }
        }

        let mut previous_start = None;
        for (index, hold) in waiting.iter_mut().enumerate() {
            hold.position = Some(index as u32 + 1);
            hold.end = None;
            if let Some(previous) = previous_start {
                if hold.start < previous {
                    hold.start = previous;
                }
            }
            previous_start = Some(hold.start);
        }

        for hold in reserved.iter().chain(waiting.iter()) {
            services.holds.update_hold(hold).await?;
        }

        let available = slots.saturating_sub(reserved_count) as u32;
        services
            .holds
            .update_counters(resource, reserved_count as u32, available)
            .await?;

        let collection = services.holds.collection_of(resource).await?;
        Ok(newly_reserved
            .into_iter()
            .map(|hold| CirculationEvent::HoldReady {
                collection: collection.clone(),
                resource: resource.clone(),
                patron: hold.patron,
            })
            .collect())
    }

    /// Sweep every resource with holds in a collection
    ///
    /// Guarded by a per-collection task lock; a busy lock means another
    /// sweep is running, so this one logs and exits (the next scheduled run
    /// retries). Returns whether the sweep actually ran.
    pub async fn recalculate_collection(
        &self,
        collection: &CollectionId,
    ) -> Result<bool, EngineError> {
        let services = self.services;
        let namespace = services.namespace();
        let lock = TaskLock::new(
            services.store.clone(),
            &namespace,
            Some(&format!("hold-queue::{collection}")),
            None,
            services.tokens.as_ref(),
            LockConfig::new().with_ttl(Some(services.config.holds.lock_ttl)),
        )?;

        if !lock.acquire()? {
            tracing::info!(%collection, "hold queue sweep already running, skipping");
            return Ok(false);
        }

        let swept = self.sweep(collection, &lock).await;
        let released = lock.release();
        swept?;
        released?;
        Ok(true)
    }

    async fn sweep(&self, collection: &CollectionId, lock: &TaskLock) -> Result<(), EngineError> {
        let services = self.services;
        let batch_size = services.config.holds.batch_size;
        let period = services.config.holds.reservation_period;
        let mut cursor: Option<ResourceId> = None;

        loop {
            let page = services
                .holds
                .resources_with_holds(collection, cursor.as_ref(), batch_size)
                .await?;
            let Some(last) = page.last().cloned() else {
                return Ok(());
            };

            for resource in &page {
                // A resource deleted mid-sweep is skipped, not an error
                if !services.holds.resource_exists(resource).await? {
                    tracing::warn!(%collection, %resource, "resource vanished mid-sweep, skipping");
                    continue;
                }
                let events = self.recalculate(resource, period).await?;
                for event in &events {
                    services.analytics.dispatch(event).await?;
                }
            }

            if page.len() < batch_size {
                return Ok(());
            }
            cursor = Some(last);
            lock.extend_timeout()?;
        }
    }

    /// Delete reserved holds whose reservation window lapsed unused
    ///
    /// Only `position == 0 && end < now` holds are touched; waiting holds
    /// never expire. One `HoldExpired` event is dispatched per removal and
    /// the full list is returned.
    pub async fn reap_expired(
        &self,
        collection: &CollectionId,
    ) -> Result<Vec<CirculationEvent>, EngineError> {
        let services = self.services;
        let now = services.clock.now();
        let expired = services
            .holds
            .expired_reserved_holds(collection, now)
            .await?;

        let mut events = Vec::with_capacity(expired.len());
        for hold in expired {
            services.holds.delete_hold(&hold.id).await?;
            let event = CirculationEvent::HoldExpired {
                collection: collection.clone(),
                resource: hold.resource,
                patron: hold.patron,
            };
            services.analytics.dispatch(&event).await?;
            events.push(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
#[path = "holds_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-injection context for jobs and engines
//!
//! One `Services` value is built per worker process and passed by reference
//! into every job entry point and engine call. Nothing in this crate reads
//! process-global state.

use crate::adapters::{AnalyticsSink, ApplySink, HoldStore, VendorRegistry};
use crate::clock::Clock;
use crate::config::CoordinationConfig;
use crate::coordination::LockConfig;
use crate::store::{KeyStore, Namespace};
use crate::token::TokenGen;
use std::sync::Arc;

/// Everything a background job needs, built once per process
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn KeyStore>,
    pub holds: Arc<dyn HoldStore>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub apply: Arc<dyn ApplySink>,
    pub vendors: VendorRegistry,
    pub clock: Arc<dyn Clock>,
    pub tokens: Arc<dyn TokenGen>,
    pub config: CoordinationConfig,
}

impl Services {
    pub fn new(
        store: Arc<dyn KeyStore>,
        holds: Arc<dyn HoldStore>,
        analytics: Arc<dyn AnalyticsSink>,
        apply: Arc<dyn ApplySink>,
        clock: Arc<dyn Clock>,
        tokens: Arc<dyn TokenGen>,
    ) -> Self {
        Self {
            store,
            holds,
            analytics,
            apply,
            vendors: VendorRegistry::new(),
            clock,
            tokens,
            config: CoordinationConfig::default(),
        }
    }

    pub fn with_vendors(mut self, vendors: VendorRegistry) -> Self {
        self.vendors = vendors;
        self
    }

    pub fn with_config(mut self, config: CoordinationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn namespace(&self) -> Namespace {
        self.config.namespace()
    }

    /// Lock configuration seeded from the process defaults
    pub fn lock_config(&self) -> LockConfig {
        LockConfig::new()
            .with_ttl(self.config.lock.ttl)
            .with_poll_interval(self.config.lock.poll_interval)
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination configuration
//!
//! One `CoordinationConfig` is loaded per worker process and travels inside
//! the `Services` context. Durations are written in humantime form
//! (`"15m"`, `"12h"`, `"14d"`).

use crate::store::Namespace;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Process-wide coordination settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Environment prefix every store key carries
    pub namespace: String,
    pub lock: LockDefaults,
    pub sync: SyncExpiry,
    pub holds: HoldSweepConfig,
    pub retry: RetryDefaults,
}

impl CoordinationConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(&self.namespace)
    }
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            namespace: "circ".to_string(),
            lock: LockDefaults::default(),
            sync: SyncExpiry::default(),
            holds: HoldSweepConfig::default(),
            retry: RetryDefaults::default(),
        }
    }
}

/// Defaults for distributed locks
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LockDefaults {
    /// Lock TTL; omit for manual-release-only locks
    #[serde(with = "humantime_serde")]
    pub ttl: Option<Duration>,
    /// Sleep between acquisition attempts in `acquire_blocking`
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for LockDefaults {
    fn default() -> Self {
        Self {
            ttl: Some(Duration::from_secs(600)),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Per-state expiry windows for patron sync statuses
///
/// LOCKED is the shortest (safety net against a crashed worker), FAILED
/// permits retry before SUCCESS would re-sync, NOT_SUPPORTED rarely changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncExpiry {
    #[serde(with = "humantime_serde")]
    pub locked: Duration,
    #[serde(with = "humantime_serde")]
    pub failed: Duration,
    #[serde(with = "humantime_serde")]
    pub success: Duration,
    #[serde(with = "humantime_serde")]
    pub not_supported: Duration,
}

impl Default for SyncExpiry {
    fn default() -> Self {
        Self {
            locked: Duration::from_secs(15 * 60),
            failed: Duration::from_secs(4 * 60 * 60),
            success: Duration::from_secs(12 * 60 * 60),
            not_supported: Duration::from_secs(14 * 24 * 60 * 60),
        }
    }
}

/// Hold-queue sweep settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldSweepConfig {
    /// How long a reserved hold stays ready for checkout
    #[serde(with = "humantime_serde")]
    pub reservation_period: Duration,
    /// Resources fetched per page during a collection sweep
    pub batch_size: usize,
    /// TTL on the per-collection sweep lock, refreshed between batches
    #[serde(with = "humantime_serde")]
    pub lock_ttl: Duration,
}

impl Default for HoldSweepConfig {
    fn default() -> Self {
        Self {
            reservation_period: Duration::from_secs(3 * 24 * 60 * 60),
            batch_size: 25,
            lock_ttl: Duration::from_secs(600),
        }
    }
}

/// Retry/backoff defaults for background jobs
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryDefaults {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
        }
    }
}

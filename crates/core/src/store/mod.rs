// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value store contract shared by all coordination primitives
//!
//! The store is the sole shared mutable resource between worker processes.
//! Every write exposed here is a single atomic primitive: ownership-checked
//! SET/DELETE/EXPIRE variants for locks, and atomic pop for sets. Keys always
//! carry an environment namespace so several deployments can share one store.

mod memory;

pub use memory::MemoryStore;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A string operation hit a set key or vice versa; corrupted coordination
    /// state fails loudly instead of being coerced
    #[error("wrong value kind at key: {key}")]
    WrongKind { key: String },
    #[error("keys cross namespaces: {left} vs {right}")]
    CrossNamespace { left: String, right: String },
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Environment prefix carried by every key
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A namespaced store key, rendered `namespace::segment::segment`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreKey {
    namespace: Namespace,
    path: String,
}

impl StoreKey {
    pub fn new(namespace: &Namespace, segments: &[&str]) -> Self {
        Self {
            namespace: namespace.clone(),
            path: segments.join("::"),
        }
    }

    /// Rebuild a key from a previously rendered path (set handles, scans)
    pub fn from_path(namespace: &Namespace, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.clone(),
            path: path.into(),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Guard for multi-key operations: both keys must share one namespace
    pub fn same_namespace(&self, other: &StoreKey) -> Result<(), StoreError> {
        if self.namespace == other.namespace {
            Ok(())
        } else {
            Err(StoreError::CrossNamespace {
                left: self.to_string(),
                right: other.to_string(),
            })
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.namespace, self.path)
    }
}

/// Write mode for `KeyStore::set`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetMode {
    Always,
    /// Succeed only when the key is absent (lock acquisition)
    IfAbsent,
    /// Succeed only when the key already exists
    IfPresent,
}

/// The shared fast store every coordination primitive runs against
///
/// Implementations must make each method atomic with respect to concurrent
/// callers. String values and set values are distinct kinds; mixing them is
/// a `WrongKind` error.
pub trait KeyStore: Send + Sync {
    // String operations

    fn get(&self, key: &StoreKey) -> Result<Option<String>, StoreError>;

    /// Returns whether the write happened under the given mode
    fn set(
        &self,
        key: &StoreKey,
        value: &str,
        mode: SetMode,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    /// Compare-and-swap on the current string value
    fn set_if_value(
        &self,
        key: &StoreKey,
        expected: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    fn delete(&self, key: &StoreKey) -> Result<bool, StoreError>;

    /// Ownership-checked delete: removes the key only when its current value
    /// matches `expected`
    fn delete_if_value(&self, key: &StoreKey, expected: &str) -> Result<bool, StoreError>;

    fn expire(&self, key: &StoreKey, ttl: Duration) -> Result<bool, StoreError>;

    /// Ownership-checked expire, for TTL extension by the lock owner
    fn expire_if_value(
        &self,
        key: &StoreKey,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Remaining TTL; `None` when the key is absent or has no expiry
    fn ttl(&self, key: &StoreKey) -> Result<Option<Duration>, StoreError>;

    fn exists(&self, key: &StoreKey) -> Result<bool, StoreError>;

    // Set operations

    /// Add members, returning how many were newly added
    fn sadd(&self, key: &StoreKey, members: &[String]) -> Result<usize, StoreError>;

    /// Remove members, returning how many were present
    fn srem(&self, key: &StoreKey, members: &[String]) -> Result<usize, StoreError>;

    /// Atomically remove and return up to `count` members
    fn spop(&self, key: &StoreKey, count: usize) -> Result<Vec<String>, StoreError>;

    fn smembers(&self, key: &StoreKey) -> Result<Vec<String>, StoreError>;

    fn scard(&self, key: &StoreKey) -> Result<usize, StoreError>;

    fn sismember(&self, key: &StoreKey, member: &str) -> Result<bool, StoreError>;

    /// Keys in the namespace whose path starts with `prefix`
    fn keys(&self, namespace: &Namespace, prefix: &str) -> Result<Vec<StoreKey>, StoreError>;
}

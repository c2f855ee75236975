// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed, typed, TTL-bounded identifier set
//!
//! Used for reconciliation across paginated or chained jobs: a run inserts
//! every identifier it observes into an `active` set, a persisted `existing`
//! set holds everything known before the run, and `existing - active` is the
//! removable set. A `SetHandle` hands a live set across job boundaries
//! without re-sending its contents.

use crate::store::{KeyStore, Namespace, StoreError, StoreKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const SEPARATOR: char = '|';

#[derive(Debug, Error)]
pub enum SetError {
    /// The kind would make the encoded member ambiguous
    #[error("identifier kind contains the member separator: {0:?}")]
    BadKind(String),
    #[error("malformed set member: {0:?}")]
    Malformed(String),
    /// Subtracting sets on different stores would silently materialize both
    #[error("identifier sets live on distinct stores")]
    DistinctStores,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A typed identifier: `(kind, value)` encoded as `kind|value`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    pub kind: String,
    pub value: String,
}

impl Identifier {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// The kind must not contain the separator; the value may, since the
    /// first separator is the boundary
    fn encode(&self) -> Result<String, SetError> {
        if self.kind.contains(SEPARATOR) {
            return Err(SetError::BadKind(self.kind.clone()));
        }
        Ok(format!("{}{}{}", self.kind, SEPARATOR, self.value))
    }

    fn decode(member: &str) -> Result<Self, SetError> {
        let (kind, value) = member
            .split_once(SEPARATOR)
            .ok_or_else(|| SetError::Malformed(member.to_string()))?;
        Ok(Self::new(kind, value))
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.kind, SEPARATOR, self.value)
    }
}

/// Serializable reference to a live set: key and expiry, never contents
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetHandle {
    pub namespace: String,
    pub path: String,
    #[serde(with = "humantime_serde")]
    pub expiry: Duration,
}

/// Store-backed set of typed identifiers with a rolling TTL
pub struct IdentifierSet {
    store: Arc<dyn KeyStore>,
    key: StoreKey,
    expiry: Duration,
}

impl IdentifierSet {
    pub fn new(
        store: Arc<dyn KeyStore>,
        namespace: &Namespace,
        name: &str,
        expiry: Duration,
    ) -> Self {
        Self {
            store,
            key: StoreKey::new(namespace, &["identifier-set", name]),
            expiry,
        }
    }

    /// Reattach to a set handed over from another job
    pub fn from_handle(store: Arc<dyn KeyStore>, handle: &SetHandle) -> Self {
        let namespace = Namespace::new(&handle.namespace);
        Self {
            store,
            key: StoreKey::from_path(&namespace, &handle.path),
            expiry: handle.expiry,
        }
    }

    /// Serialize this set's reference for hand-off across chained jobs
    pub fn handle(&self) -> SetHandle {
        SetHandle {
            namespace: self.key.namespace().as_str().to_string(),
            path: self.key.path().to_string(),
            expiry: self.expiry,
        }
    }

    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Add identifiers, returning how many were newly added
    ///
    /// Every call refreshes the TTL as a keep-alive, but an empty call never
    /// creates an absent set.
    pub fn add(&self, items: &[Identifier]) -> Result<usize, SetError> {
        if items.is_empty() {
            if self.store.exists(&self.key)? {
                self.store.expire(&self.key, self.expiry)?;
            }
            return Ok(0);
        }

        let members = self.encode_all(items)?;
        let added = self.store.sadd(&self.key, &members)?;
        self.store.expire(&self.key, self.expiry)?;
        Ok(added)
    }

    /// Remove identifiers, ignoring absent ones; returns how many were present
    pub fn remove(&self, items: &[Identifier]) -> Result<usize, SetError> {
        if items.is_empty() {
            return Ok(0);
        }
        let members = self.encode_all(items)?;
        Ok(self.store.srem(&self.key, &members)?)
    }

    /// Atomically remove and return up to `count` members; empty when exhausted
    pub fn pop(&self, count: usize) -> Result<Vec<Identifier>, SetError> {
        self.store
            .spop(&self.key, count)?
            .iter()
            .map(|member| Identifier::decode(member))
            .collect()
    }

    /// Full snapshot of the current members
    pub fn get(&self) -> Result<Vec<Identifier>, SetError> {
        self.store
            .smembers(&self.key)?
            .iter()
            .map(|member| Identifier::decode(member))
            .collect()
    }

    /// Restartable iteration over a fresh snapshot
    pub fn iter(&self) -> Result<impl Iterator<Item = Identifier>, SetError> {
        Ok(self.get()?.into_iter())
    }

    pub fn len(&self) -> Result<usize, SetError> {
        Ok(self.store.scard(&self.key)?)
    }

    pub fn is_empty(&self) -> Result<bool, SetError> {
        Ok(self.len()? == 0)
    }

    pub fn exists(&self) -> Result<bool, SetError> {
        Ok(self.store.exists(&self.key)?)
    }

    pub fn contains(&self, item: &Identifier) -> Result<bool, SetError> {
        Ok(self.store.sismember(&self.key, &item.encode()?)?)
    }

    /// Destroy the set
    pub fn delete(&self) -> Result<bool, SetError> {
        Ok(self.store.delete(&self.key)?)
    }

    /// Members of this set absent from `other`
    ///
    /// Both sets must live on the same store and in the same namespace.
    pub fn diff(&self, other: &IdentifierSet) -> Result<Vec<Identifier>, SetError> {
        if !Arc::ptr_eq(&self.store, &other.store) {
            return Err(SetError::DistinctStores);
        }
        self.key.same_namespace(&other.key)?;

        let subtrahend: HashSet<Identifier> = other.get()?.into_iter().collect();
        self.diff_local(&subtrahend)
    }

    /// Members of this set absent from a plain in-memory set
    pub fn diff_local(&self, other: &HashSet<Identifier>) -> Result<Vec<Identifier>, SetError> {
        let mut remaining: Vec<Identifier> = self
            .get()?
            .into_iter()
            .filter(|item| !other.contains(item))
            .collect();
        remaining.sort();
        Ok(remaining)
    }

    fn encode_all(&self, items: &[Identifier]) -> Result<Vec<String>, SetError> {
        items.iter().map(Identifier::encode).collect()
    }
}

#[cfg(test)]
#[path = "identifier_set_tests.rs"]
mod tests;

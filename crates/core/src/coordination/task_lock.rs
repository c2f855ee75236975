// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed lock namespaced by background-job identity

use super::lock::{DistributedLock, LockConfig, LockError};
use crate::store::{KeyStore, Namespace, StoreKey};
use crate::token::TokenGen;
use std::ops::Deref;
use std::sync::Arc;

/// Identity of a background job, derived from its qualified type name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskIdentity(String);

impl TaskIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Identity from a job type, e.g. a job struct driven by the orchestrator
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `DistributedLock` keyed under `task-lock::<name>`
///
/// The name comes from an explicit string or from a job identity. Supplying
/// neither is a configuration error at construction time, not at first use.
pub struct TaskLock {
    inner: DistributedLock,
}

impl TaskLock {
    pub fn new(
        store: Arc<dyn KeyStore>,
        namespace: &Namespace,
        name: Option<&str>,
        identity: Option<&TaskIdentity>,
        tokens: &dyn TokenGen,
        config: LockConfig,
    ) -> Result<Self, LockError> {
        let name = name
            .map(str::to_string)
            .or_else(|| identity.map(|id| id.to_string()))
            .ok_or(LockError::MissingName)?;
        let key = StoreKey::new(namespace, &["task-lock", &name]);
        Ok(Self {
            inner: DistributedLock::from_key(store, key, tokens, config),
        })
    }
}

impl Deref for TaskLock {
    type Target = DistributedLock;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed lock with owner tokens and TTL-bounded exclusion
//!
//! The lock key's value is an opaque random token written at acquisition.
//! Only the writer holding the matching token may release or extend the
//! lock, which guards against a TTL-expired-but-still-running worker
//! mutating state it no longer owns.

use crate::store::{KeyStore, Namespace, SetMode, StoreError, StoreKey};
use crate::token::TokenGen;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("invalid lock timeout: {0}")]
    InvalidTimeout(String),
    #[error("lock scope re-entered while already held: {0}")]
    Reentrant(String),
    #[error("task lock requires an explicit name or a job identity")]
    MissingName,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Lock configuration
#[derive(Clone, Debug)]
pub struct LockConfig {
    /// TTL on the lock key; `None` means manual-release-only
    pub ttl: Option<Duration>,
    /// Sleep between attempts in `acquire_blocking`
    pub poll_interval: Duration,
    /// Release on normal exit from a `run_locked` scope
    pub release_on_exit: bool,
    /// Release when the `run_locked` closure fails
    pub release_on_error: bool,
}

impl LockConfig {
    pub fn new() -> Self {
        Self {
            ttl: Some(Duration::from_secs(600)),
            poll_interval: Duration::from_millis(500),
            release_on_exit: true,
            release_on_error: true,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_release_on_exit(mut self, release: bool) -> Self {
        self.release_on_exit = release;
        self
    }

    pub fn with_release_on_error(mut self, release: bool) -> Self {
        self.release_on_error = release;
        self
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a scoped `run_locked` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome<T> {
    /// The lock was acquired and the closure ran
    Acquired(T),
    /// Someone else holds the lock; the closure never ran
    Busy,
}

impl<T> LockOutcome<T> {
    pub fn acquired(&self) -> bool {
        matches!(self, LockOutcome::Acquired(_))
    }
}

/// TTL-bounded mutual exclusion keyed by the shared store
pub struct DistributedLock {
    store: Arc<dyn KeyStore>,
    key: StoreKey,
    token: String,
    config: LockConfig,
    in_scope: AtomicBool,
}

impl DistributedLock {
    pub fn new(
        store: Arc<dyn KeyStore>,
        namespace: &Namespace,
        name: &str,
        tokens: &dyn TokenGen,
        config: LockConfig,
    ) -> Self {
        let key = StoreKey::new(namespace, &["lock", name]);
        Self::from_key(store, key, tokens, config)
    }

    /// Build a lock at an explicit key, for primitives layered on the lock
    pub fn from_key(
        store: Arc<dyn KeyStore>,
        key: StoreKey,
        tokens: &dyn TokenGen,
        config: LockConfig,
    ) -> Self {
        Self {
            store,
            key,
            token: tokens.next(),
            config,
            in_scope: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Non-blocking acquisition
    ///
    /// Returns true when this owner newly acquires the lock or already holds
    /// it; re-acquisition extends the TTL and never shortens it. Returns
    /// false when a different owner holds the lock.
    pub fn acquire(&self) -> Result<bool, LockError> {
        if self
            .store
            .set(&self.key, &self.token, SetMode::IfAbsent, self.config.ttl)?
        {
            return Ok(true);
        }

        match self.store.get(&self.key)? {
            Some(value) if value == self.token => {
                if let Some(ttl) = self.config.ttl {
                    let remaining = self.store.ttl(&self.key)?.unwrap_or(Duration::ZERO);
                    let target = remaining.max(ttl);
                    self.store.expire_if_value(&self.key, &self.token, target)?;
                }
                Ok(true)
            }
            Some(_) => Ok(false),
            // Holder vanished between the SET and the GET; one more attempt
            None => Ok(self.store.set(
                &self.key,
                &self.token,
                SetMode::IfAbsent,
                self.config.ttl,
            )?),
        }
    }

    /// Poll until acquired or `timeout` elapses
    ///
    /// A zero timeout behaves like a single `acquire` attempt. The configured
    /// poll interval must be positive.
    pub fn acquire_blocking(&self, timeout: Duration) -> Result<bool, LockError> {
        if self.config.poll_interval.is_zero() {
            return Err(LockError::InvalidTimeout(
                "poll interval must be positive".to_string(),
            ));
        }

        let mut waited = Duration::ZERO;
        loop {
            if self.acquire()? {
                return Ok(true);
            }
            if waited >= timeout {
                return Ok(false);
            }
            std::thread::sleep(self.config.poll_interval);
            waited += self.config.poll_interval;
        }
    }

    /// Owner-only release; deletes the key so availability is immediate
    pub fn release(&self) -> Result<bool, LockError> {
        Ok(self.store.delete_if_value(&self.key, &self.token)?)
    }

    /// Owner-only TTL refresh; false for manual-release-only locks
    pub fn extend_timeout(&self) -> Result<bool, LockError> {
        match self.config.ttl {
            None => Ok(false),
            Some(ttl) => Ok(self.store.expire_if_value(&self.key, &self.token, ttl)?),
        }
    }

    /// Whether anyone holds the lock
    pub fn is_locked(&self) -> Result<bool, LockError> {
        Ok(self.store.get(&self.key)?.is_some())
    }

    /// Whether this owner holds the lock
    pub fn is_held_by_us(&self) -> Result<bool, LockError> {
        Ok(matches!(self.store.get(&self.key)?, Some(v) if v == self.token))
    }

    /// Scoped acquisition: acquire, run the closure, release per policy
    ///
    /// Returns `Busy` without running the closure when another owner holds
    /// the lock. Closure errors release per `release_on_error` and then
    /// propagate. Re-entering the same lock object while its scope is active
    /// is a programming error, not a deadlock.
    pub fn run_locked<T, E, F>(&self, f: F) -> Result<LockOutcome<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<LockError>,
    {
        if self
            .in_scope
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(E::from(LockError::Reentrant(self.key.to_string())));
        }

        let acquired = match self.acquire() {
            Ok(a) => a,
            Err(e) => {
                self.in_scope.store(false, Ordering::SeqCst);
                return Err(E::from(e));
            }
        };
        if !acquired {
            self.in_scope.store(false, Ordering::SeqCst);
            return Ok(LockOutcome::Busy);
        }

        match f() {
            Ok(value) => {
                if self.config.release_on_exit {
                    if let Err(e) = self.release() {
                        self.in_scope.store(false, Ordering::SeqCst);
                        return Err(E::from(e));
                    }
                }
                self.in_scope.store(false, Ordering::SeqCst);
                Ok(LockOutcome::Acquired(value))
            }
            Err(e) => {
                if self.config.release_on_error {
                    // The closure error is the interesting one; a failed
                    // release here surfaces on the next TTL expiry anyway
                    let _ = self.release();
                }
                self.in_scope.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;

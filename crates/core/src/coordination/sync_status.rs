// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-(patron, collection) sync state machine layered on the lock key
//!
//! The whole status lives inside the lock's own value as a fixed-offset
//! ASCII string: one state character, ten epoch-second digits, then the
//! owning task id. One store read reconstructs full status. Each state
//! carries its own expiry window so statuses self-clean: LOCKED is the
//! shortest (a crashed worker frees the slot), FAILED permits retry before
//! SUCCESS would drive a periodic re-sync, NOT_SUPPORTED rarely changes.

use crate::clock::Clock;
use crate::config::SyncExpiry;
use crate::hold::{CollectionId, PatronId};
use crate::store::{KeyStore, Namespace, SetMode, StoreError, StoreKey};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    /// Corrupted coordination state fails loudly instead of being coerced
    #[error("malformed sync status at {key}: {value:?}")]
    Malformed { key: String, value: String },
    #[error("sync status scope re-entered while already held: {0}")]
    Reentrant(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sync lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Locked,
    Success,
    Failed,
    /// Terminal status, not an error: this integration can't do this, so
    /// callers stop retrying
    NotSupported,
}

impl SyncState {
    fn code(self) -> char {
        match self {
            SyncState::Locked => 'L',
            SyncState::Success => 'S',
            SyncState::Failed => 'F',
            SyncState::NotSupported => 'N',
        }
    }

    fn from_code(code: char) -> Option<Self> {
        match code {
            'L' => Some(SyncState::Locked),
            'S' => Some(SyncState::Success),
            'F' => Some(SyncState::Failed),
            'N' => Some(SyncState::NotSupported),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, SyncState::Locked)
    }

    fn expiry(self, windows: &SyncExpiry) -> std::time::Duration {
        match self {
            SyncState::Locked => windows.locked,
            SyncState::Success => windows.success,
            SyncState::Failed => windows.failed,
            SyncState::NotSupported => windows.not_supported,
        }
    }
}

/// Decoded status value: state, owning task, when it was written
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncStatusRecord {
    pub state: SyncState,
    pub task_id: String,
    pub timestamp: DateTime<Utc>,
}

impl SyncStatusRecord {
    fn new(state: SyncState, task_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            state,
            task_id: task_id.to_string(),
            timestamp: now,
        }
    }

    /// `<state char><10-digit epoch seconds><task id>`
    fn encode(&self) -> String {
        format!(
            "{}{:010}{}",
            self.state.code(),
            self.timestamp.timestamp(),
            self.task_id
        )
    }

    fn decode(key: &StoreKey, raw: &str) -> Result<Self, StatusError> {
        let malformed = || StatusError::Malformed {
            key: key.to_string(),
            value: raw.to_string(),
        };

        let mut chars = raw.chars();
        let state = chars
            .next()
            .and_then(SyncState::from_code)
            .ok_or_else(malformed)?;
        let digits = raw.get(1..11).ok_or_else(malformed)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let secs: i64 = digits.parse().map_err(|_| malformed())?;
        let timestamp = DateTime::from_timestamp(secs, 0).ok_or_else(malformed)?;
        let task_id = raw.get(11..).ok_or_else(malformed)?;
        if task_id.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            state,
            task_id: task_id.to_string(),
            timestamp,
        })
    }
}

/// Result of a scoped `run` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome<T> {
    /// The status was locked and the closure ran to completion
    Completed(T),
    /// Another task holds the status; the closure never ran
    Skipped,
}

impl<T> SyncOutcome<T> {
    pub fn completed(&self) -> bool {
        matches!(self, SyncOutcome::Completed(_))
    }
}

/// Store-backed sync status for one (patron, collection) pair
pub struct SyncStatus {
    store: Arc<dyn KeyStore>,
    clock: Arc<dyn Clock>,
    key: StoreKey,
    task_id: String,
    expiry: SyncExpiry,
    in_scope: AtomicBool,
}

impl SyncStatus {
    pub fn new(
        store: Arc<dyn KeyStore>,
        clock: Arc<dyn Clock>,
        namespace: &Namespace,
        patron: &PatronId,
        collection: &CollectionId,
        task_id: impl Into<String>,
        expiry: SyncExpiry,
    ) -> Self {
        Self {
            store,
            clock,
            key: StoreKey::new(
                namespace,
                &["sync", &patron.to_string(), &collection.to_string()],
            ),
            task_id: task_id.into(),
            expiry,
            in_scope: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Acquire the status: absent → LOCKED owned by this task
    ///
    /// False when any status already exists, including our own; a duplicate
    /// task instance must not restart a sync already in flight.
    pub fn lock(&self) -> Result<bool, StatusError> {
        let record = SyncStatusRecord::new(SyncState::Locked, &self.task_id, self.clock.now());
        Ok(self.store.set(
            &self.key,
            &record.encode(),
            SetMode::IfAbsent,
            Some(SyncState::Locked.expiry(&self.expiry)),
        )?)
    }

    pub fn success(&self) -> Result<bool, StatusError> {
        self.transition(SyncState::Success)
    }

    pub fn fail(&self) -> Result<bool, StatusError> {
        self.transition(SyncState::Failed)
    }

    pub fn not_supported(&self) -> Result<bool, StatusError> {
        self.transition(SyncState::NotSupported)
    }

    /// Owner-only CAS from our LOCKED record to a terminal record
    ///
    /// False for non-owners, duplicates, and any non-LOCKED current state:
    /// stale task instances cannot clobber a fresher result.
    fn transition(&self, to: SyncState) -> Result<bool, StatusError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(false);
        };
        let current = SyncStatusRecord::decode(&self.key, &raw)?;
        if current.state != SyncState::Locked || current.task_id != self.task_id {
            return Ok(false);
        }

        let next = SyncStatusRecord::new(to, &self.task_id, self.clock.now());
        Ok(self.store.set_if_value(
            &self.key,
            &raw,
            &next.encode(),
            Some(to.expiry(&self.expiry)),
        )?)
    }

    /// Read-only status; `None` when absent or expired
    pub fn status(&self) -> Result<Option<SyncStatusRecord>, StatusError> {
        match self.store.get(&self.key)? {
            None => Ok(None),
            Some(raw) => Ok(Some(SyncStatusRecord::decode(&self.key, &raw)?)),
        }
    }

    /// Clear the status
    ///
    /// Terminal states clear unconditionally (anyone may force a re-sync).
    /// A LOCKED status clears only for its owner.
    pub fn clear(&self) -> Result<bool, StatusError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(false);
        };
        let current = SyncStatusRecord::decode(&self.key, &raw)?;
        if current.state.is_terminal() {
            return Ok(self.store.delete(&self.key)?);
        }
        if current.task_id != self.task_id {
            return Ok(false);
        }
        Ok(self.store.delete_if_value(&self.key, &raw)?)
    }

    /// Scoped usage: lock, run the closure, mark the outcome
    ///
    /// `Skipped` when the status could not be locked. On Ok the status moves
    /// to SUCCESS; on Err it moves to FAILED, the failure is logged with the
    /// status key for diagnosis, and the error propagates.
    pub fn run<T, E, F>(&self, f: F) -> Result<SyncOutcome<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<StatusError> + std::fmt::Display,
    {
        if self
            .in_scope
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(E::from(StatusError::Reentrant(self.key.to_string())));
        }

        let locked = match self.lock() {
            Ok(l) => l,
            Err(e) => {
                self.in_scope.store(false, Ordering::SeqCst);
                return Err(E::from(e));
            }
        };
        if !locked {
            self.in_scope.store(false, Ordering::SeqCst);
            return Ok(SyncOutcome::Skipped);
        }

        let result = f();
        let marked = match &result {
            Ok(_) => self.success(),
            Err(error) => {
                tracing::error!(key = %self.key, task = %self.task_id, %error, "sync failed");
                self.fail()
            }
        };
        self.in_scope.store(false, Ordering::SeqCst);
        if let Err(e) = marked {
            return Err(E::from(e));
        }
        result.map(SyncOutcome::Completed)
    }
}

/// Candidate collections whose sync status is absent or expired
///
/// Periodic patron sweeps call this to skip collections already succeeding
/// or in flight. A malformed stored status is an error, not a candidate.
pub fn collections_ready_for_sync(
    store: &Arc<dyn KeyStore>,
    namespace: &Namespace,
    patron: &PatronId,
    candidates: &[CollectionId],
) -> Result<Vec<CollectionId>, StatusError> {
    let mut ready = Vec::new();
    for collection in candidates {
        let key = StoreKey::new(
            namespace,
            &["sync", &patron.to_string(), &collection.to_string()],
        );
        match store.get(&key)? {
            None => ready.push(collection.clone()),
            Some(raw) => {
                SyncStatusRecord::decode(&key, &raw)?;
            }
        }
    }
    Ok(ready)
}

#[cfg(test)]
#[path = "sync_status_tests.rs"]
mod tests;

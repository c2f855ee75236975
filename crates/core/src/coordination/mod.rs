// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination primitives for distributed background jobs
//!
//! This module provides:
//! - **DistributedLock** - TTL-bounded mutual exclusion with owner tokens
//! - **TaskLock** - a DistributedLock namespaced by background-job identity
//! - **SyncStatus** - a per-(patron, collection) state machine layered on the
//!   lock's own value
//! - **IdentifierSet** - a distributed, typed, TTL-bounded set for
//!   reconciliation across paginated or chained jobs

pub mod identifier_set;
pub mod lock;
pub mod sync_status;
pub mod task_lock;

pub use identifier_set::{Identifier, IdentifierSet, SetError, SetHandle};
pub use lock::{DistributedLock, LockConfig, LockError, LockOutcome};
pub use sync_status::{
    collections_ready_for_sync, StatusError, SyncOutcome, SyncState, SyncStatus, SyncStatusRecord,
};
pub use task_lock::{TaskIdentity, TaskLock};

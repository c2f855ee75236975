// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use circ_core::adapters::{AnalyticsError, ApplyError, HoldStoreError, VendorError};
use circ_core::coordination::{LockError, SetError, StatusError};
use circ_core::store::StoreError;
use thiserror::Error;

/// Errors that can occur in the hold-queue engine and orchestration glue
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
    #[error("sync status error: {0}")]
    Status(#[from] StatusError),
    #[error("identifier set error: {0}")]
    Set(#[from] SetError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("hold store error: {0}")]
    Holds(#[from] HoldStoreError),
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),
    #[error("vendor error: {0}")]
    Vendor(#[from] VendorError),
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner-token generation abstractions
//!
//! Every lock acquisition writes an opaque random token; ownership checks
//! compare against it on release and extend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates opaque owner tokens and task ids
pub trait TokenGen: Send + Sync {
    fn next(&self) -> String;
}

/// UUID-based token generator for production use
#[derive(Clone, Default)]
pub struct UuidTokenGen;

impl TokenGen for UuidTokenGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Sequential token generator for testing
#[derive(Clone)]
pub struct SequentialTokenGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialTokenGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialTokenGen {
    fn default() -> Self {
        Self::new("token")
    }
}

impl TokenGen for SequentialTokenGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}

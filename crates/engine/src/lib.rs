// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Hold-queue recalculation and background-job orchestration for the
//! circulation coordination layer

mod error;
mod holds;
mod import;
mod orchestrator;

pub use error::EngineError;
pub use holds::HoldQueueEngine;
pub use import::{finalize_children, ImportReconciler};
pub use orchestrator::{Continuation, Job, JobError, Orchestrator, RetryPolicy};

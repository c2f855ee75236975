// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background-job orchestration: pagination, retry with backoff, and
//! sync-status guarding
//!
//! A `Job` runs one invocation and either finishes or returns the arguments
//! for its next page; the orchestrator drives that chain, retrying transient
//! failures with exponential backoff. `drive_synced` wraps a whole chain in
//! a `SyncStatus` so duplicate workers skip instead of double-running.

use crate::error::EngineError;
use async_trait::async_trait;
use circ_core::adapters::{ApplyError, HoldStoreError, VendorError};
use circ_core::config::RetryDefaults;
use circ_core::coordination::{StatusError, SyncOutcome, SyncStatus};
use circ_core::services::Services;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    /// Worth retrying with backoff
    #[error("transient job failure: {0}")]
    Transient(String),
    /// Retrying would fail the same way
    #[error("job failed: {0}")]
    Failed(String),
}

impl JobError {
    pub fn is_transient(&self) -> bool {
        matches!(self, JobError::Transient(_))
    }
}

impl From<EngineError> for JobError {
    fn from(error: EngineError) -> Self {
        let transient = matches!(
            error,
            EngineError::Holds(HoldStoreError::Conflict(_))
                | EngineError::Apply(ApplyError::Conflict(_))
                | EngineError::Vendor(VendorError::Timeout(_))
        );
        if transient {
            JobError::Transient(error.to_string())
        } else {
            JobError::Failed(error.to_string())
        }
    }
}

/// What a job invocation returns: finished, or the arguments for its next page
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Continuation<A> {
    Done,
    Continue(A),
}

/// One resumable unit of background work
///
/// Arguments are serializable so a continuation can be enqueued across
/// process boundaries, not just looped in memory.
#[async_trait]
pub trait Job: Send + Sync {
    type Args: Serialize + DeserializeOwned + Clone + Send + Sync;

    fn name(&self) -> &'static str;

    async fn run(
        &self,
        services: &Services,
        args: Self::Args,
    ) -> Result<Continuation<Self::Args>, JobError>;
}

/// Exponential backoff schedule for transient failures
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(defaults: &RetryDefaults) -> Self {
        Self {
            max_attempts: defaults.max_attempts,
            base_delay: defaults.base_delay,
            max_delay: defaults.max_delay,
        }
    }

    /// Delay after the `attempt`-th failure: base doubled per attempt, capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Drives job chains against one `Services` context
pub struct Orchestrator {
    services: Services,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(services: Services) -> Self {
        let retry = RetryPolicy::from_config(&services.config.retry);
        Self { services, retry }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run a job to completion, following continuations page by page
    pub async fn drive<J: Job>(&self, job: &J, args: J::Args) -> Result<(), JobError> {
        let mut args = args;
        loop {
            match self.run_with_retry(job, args).await? {
                Continuation::Done => return Ok(()),
                Continuation::Continue(next) => args = next,
            }
        }
    }

    /// One invocation with retry; non-transient errors surface immediately
    async fn run_with_retry<J: Job>(
        &self,
        job: &J,
        args: J::Args,
    ) -> Result<Continuation<J::Args>, JobError> {
        let mut attempt = 1;
        loop {
            match job.run(&self.services, args.clone()).await {
                Ok(next) => return Ok(next),
                Err(error) if error.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        job = job.name(),
                        attempt,
                        ?delay,
                        %error,
                        "transient job failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Run a whole chain under a sync status
    ///
    /// `Skipped` when another task already holds the status. Success marks
    /// SUCCESS; any error marks FAILED and propagates.
    pub async fn drive_synced<J: Job>(
        &self,
        job: &J,
        args: J::Args,
        status: &SyncStatus,
    ) -> Result<SyncOutcome<()>, JobError> {
        if !status.lock().map_err(status_failed)? {
            tracing::info!(job = job.name(), key = %status.key(), "sync already in flight, skipping");
            return Ok(SyncOutcome::Skipped);
        }

        match self.drive(job, args).await {
            Ok(()) => {
                status.success().map_err(status_failed)?;
                Ok(SyncOutcome::Completed(()))
            }
            Err(error) => {
                tracing::error!(job = job.name(), key = %status.key(), %error, "synced job failed");
                status.fail().map_err(status_failed)?;
                Err(error)
            }
        }
    }
}

fn status_failed(error: StatusError) -> JobError {
    JobError::Failed(error.to_string())
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

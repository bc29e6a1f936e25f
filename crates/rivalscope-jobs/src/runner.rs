//! Polling state machine for a single job.
//!
//! ```text
//! Submitted ──poll──▶ Polling(n) ──poll──▶ Polling(n+1) … ──▶ LocalTimeout
//!     │                  │
//!     └──────────────────┴──▶ Succeeded | Failed(failed / aborted / timed_out)
//! ```
//!
//! Transitions are pure ([`JobState::on_status`]) so the retry and timeout
//! policy is testable without any HTTP.

use std::time::Duration;

use crate::error::JobError;
use crate::types::{JobId, JobService, JobSpec, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Status checks allowed before giving up locally.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Submitted { job_id: JobId },
    Polling { job_id: JobId, attempts: u32 },
    Succeeded { job_id: JobId },
    Failed { job_id: JobId, status: JobStatus },
    LocalTimeout { job_id: JobId, attempts: u32 },
}

impl JobState {
    #[must_use]
    pub fn job_id(&self) -> &JobId {
        match self {
            JobState::Submitted { job_id }
            | JobState::Polling { job_id, .. }
            | JobState::Succeeded { job_id }
            | JobState::Failed { job_id, .. }
            | JobState::LocalTimeout { job_id, .. } => job_id,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded { .. } | JobState::Failed { .. } | JobState::LocalTimeout { .. }
        )
    }

    /// Status checks performed so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            JobState::Submitted { .. } | JobState::Succeeded { .. } | JobState::Failed { .. } => 0,
            JobState::Polling { attempts, .. } | JobState::LocalTimeout { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Applies one observed status. Terminal states absorb further input.
    #[must_use]
    pub fn on_status(self, status: JobStatus, policy: &PollPolicy) -> JobState {
        let attempts = self.attempts() + 1;
        let job_id = match self {
            JobState::Submitted { job_id } | JobState::Polling { job_id, .. } => job_id,
            terminal => return terminal,
        };

        match status {
            JobStatus::Succeeded => JobState::Succeeded { job_id },
            JobStatus::Failed | JobStatus::Aborted | JobStatus::TimedOut => {
                JobState::Failed { job_id, status }
            }
            JobStatus::Running if attempts >= policy.max_attempts => {
                JobState::LocalTimeout { job_id, attempts }
            }
            JobStatus::Running => JobState::Polling { job_id, attempts },
        }
    }
}

/// Drives one job from submit to fetched results.
pub struct JobRunner<'a> {
    service: &'a dyn JobService,
    policy: PollPolicy,
}

impl<'a> JobRunner<'a> {
    #[must_use]
    pub fn new(service: &'a dyn JobService, policy: PollPolicy) -> Self {
        Self { service, policy }
    }

    /// Submits `spec`, waits for a terminal status and returns the raw items.
    ///
    /// # Errors
    ///
    /// - [`JobError::Terminal`] when the service reports failed, aborted or timed out.
    /// - [`JobError::LocalTimeout`] when `max_attempts` checks pass without a terminal status.
    /// - Any transport error from the service.
    pub async fn run(&self, spec: &JobSpec) -> Result<Vec<serde_json::Value>, JobError> {
        let job_id = self.service.submit(spec).await?;
        let mut state = JobState::Submitted { job_id };

        loop {
            state = match state {
                JobState::Succeeded { job_id } => {
                    tracing::info!(run_id = %job_id, "job succeeded, fetching results");
                    return self.service.fetch_results(&job_id).await;
                }
                JobState::Failed { job_id, status } => {
                    return Err(JobError::Terminal { job_id, status });
                }
                JobState::LocalTimeout { job_id, attempts } => {
                    return Err(JobError::LocalTimeout { job_id, attempts });
                }
                waiting @ (JobState::Submitted { .. } | JobState::Polling { .. }) => {
                    tokio::time::sleep(self.policy.interval).await;
                    let status = self.service.poll(waiting.job_id()).await?;
                    tracing::debug!(
                        run_id = %waiting.job_id(),
                        attempt = waiting.attempts() + 1,
                        %status,
                        "job status"
                    );
                    waiting.on_status(status, &self.policy)
                }
            };
        }
    }
}

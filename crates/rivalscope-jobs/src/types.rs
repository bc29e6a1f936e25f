use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Identifier assigned by the job service on submit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to run and with which input. The input shape belongs to the actor.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub actor_id: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
}

impl JobStatus {
    /// Maps an Apify run status. Transitional states (`READY`, `TIMING-OUT`,
    /// `ABORTING`) are still running from the caller's point of view.
    #[must_use]
    pub fn from_apify(raw: &str) -> Option<Self> {
        match raw {
            "READY" | "RUNNING" | "TIMING-OUT" | "ABORTING" => Some(JobStatus::Running),
            "SUCCEEDED" => Some(JobStatus::Succeeded),
            "FAILED" => Some(JobStatus::Failed),
            "ABORTED" => Some(JobStatus::Aborted),
            "TIMED-OUT" => Some(JobStatus::TimedOut),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Aborted => "aborted",
            JobStatus::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire contract of an asynchronous job-execution service.
#[async_trait]
pub trait JobService: Send + Sync {
    async fn submit(&self, spec: &JobSpec) -> Result<JobId, JobError>;

    async fn poll(&self, job_id: &JobId) -> Result<JobStatus, JobError>;

    async fn fetch_results(&self, job_id: &JobId) -> Result<Vec<serde_json::Value>, JobError>;
}

/// Envelope used by every Apify v2 object response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunData {
    pub id: String,
    pub status: String,
}

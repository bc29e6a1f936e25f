use rivalscope_core::{ConfigError, StoreError};
use rivalscope_jobs::JobError;
use thiserror::Error;
use uuid::Uuid;

use crate::sources::PlatformReport;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Job(#[from] JobError),
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("completion service returned no content")]
    EmptyResponse,

    #[error("malformed classification output: {0}")]
    Malformed(String),
}

/// Failure to construct the production collaborators.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("job service client: {0}")]
    Job(#[from] JobError),

    #[error("completion client: {0}")]
    Completion(#[from] CompletionError),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("competitor {0} not found")]
    CompetitorNotFound(Uuid),

    #[error(
        "no social profiles configured for this competitor; add at least one profile URL \
         (Instagram, Facebook, TikTok or YouTube) before running an analysis"
    )]
    NoProfilesConfigured,

    #[error("{}", crate::pipeline::zero_results_message(.reports))]
    NoPostsFound { reports: Vec<PlatformReport> },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl AnalysisError {
    /// Whether the failure is the caller's to fix (bad input or empty
    /// scrape) rather than an infrastructure fault.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AnalysisError::NoProfilesConfigured | AnalysisError::NoPostsFound { .. }
        )
    }
}

use thiserror::Error;

use crate::types::{JobId, JobStatus};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("job service reported unknown status \"{0}\"")]
    UnknownStatus(String),

    #[error("job {job_id} ended with status {status}")]
    Terminal { job_id: JobId, status: JobStatus },

    #[error("job {job_id} still running after {attempts} status checks")]
    LocalTimeout { job_id: JobId, attempts: u32 },
}

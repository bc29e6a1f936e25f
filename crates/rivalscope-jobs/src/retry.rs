//! Exponential backoff for transient job-service failures.
//!
//! Network failures, HTTP 429 and HTTP 5xx are retried. Everything else,
//! including a job that finished in a failed state, is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::JobError;

const MAX_DELAY_SECS: u64 = 60;

fn is_retriable(err: &JobError) -> bool {
    match err {
        JobError::Http(_) => true,
        JobError::Api { status, .. } => *status == 429 || *status >= 500,
        JobError::Deserialize { .. }
        | JobError::UnknownStatus(_)
        | JobError::Terminal { .. }
        | JobError::LocalTimeout { .. } => false,
    }
}

/// Sleep before retry `attempt + 1`, capped at [`MAX_DELAY_SECS`].
fn backoff_delay_secs(backoff_base_secs: u64, attempt: u32) -> u64 {
    backoff_base_secs
        .saturating_mul(1u64 << attempt.min(62))
        .min(MAX_DELAY_SECS)
}

/// Runs `operation`, retrying transient errors up to `max_retries` extra
/// times. The sleep before retry `n` is `backoff_base_secs * 2^(n-1)`,
/// never more than a minute.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, JobError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, JobError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !is_retriable(&err) || attempt >= max_retries => return Err(err),
            Err(err) => err,
        };

        let delay_secs = backoff_delay_secs(backoff_base_secs, attempt);
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient job service error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

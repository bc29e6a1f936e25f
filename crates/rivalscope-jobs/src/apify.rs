use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::JobError;
use crate::retry::retry_with_backoff;
use crate::types::{ApiResponse, JobId, JobService, JobSpec, JobStatus, RunData};

/// [`JobService`] backed by the Apify actor-run REST API.
///
/// Every request is retried on network failures, 429 and 5xx up to
/// `max_retries` extra attempts.
pub struct ApifyJobService {
    client: Client,
    base_url: String,
    token: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl ApifyJobService {
    /// # Errors
    ///
    /// Returns [`JobError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(
        base_url: &str,
        token: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, JobError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            max_retries,
            backoff_base_secs,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T, JobError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(JobError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| JobError::Deserialize {
            context: context.to_string(),
            source,
        })
    }
}

#[async_trait]
impl JobService for ApifyJobService {
    async fn submit(&self, spec: &JobSpec) -> Result<JobId, JobError> {
        let url = format!("{}/acts/{}/runs", self.base_url, spec.actor_id);
        let run: ApiResponse<RunData> = retry_with_backoff(
            self.max_retries,
            self.backoff_base_secs,
            || self.send_json(self.client.post(&url).json(&spec.input), "actor run start"),
        )
        .await?;

        tracing::info!(actor = %spec.actor_id, run_id = %run.data.id, "job submitted");
        Ok(JobId(run.data.id))
    }

    async fn poll(&self, job_id: &JobId) -> Result<JobStatus, JobError> {
        let url = format!("{}/actor-runs/{job_id}", self.base_url);
        let run: ApiResponse<RunData> = retry_with_backoff(
            self.max_retries,
            self.backoff_base_secs,
            || self.send_json(self.client.get(&url), "actor run status"),
        )
        .await?;

        JobStatus::from_apify(&run.data.status).ok_or(JobError::UnknownStatus(run.data.status))
    }

    async fn fetch_results(&self, job_id: &JobId) -> Result<Vec<serde_json::Value>, JobError> {
        let url = format!("{}/actor-runs/{job_id}/dataset/items", self.base_url);
        let items: Vec<serde_json::Value> = retry_with_backoff(
            self.max_retries,
            self.backoff_base_secs,
            || {
                self.send_json(
                    self.client
                        .get(&url)
                        .query(&[("format", "json"), ("clean", "true")]),
                    "dataset items",
                )
            },
        )
        .await?;

        tracing::debug!(run_id = %job_id, count = items.len(), "fetched job results");
        Ok(items)
    }
}

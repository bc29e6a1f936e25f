//! Wiring of the production collaborators from [`AppConfig`].

use std::sync::Arc;

use rivalscope_core::{AnalysisStore, AppConfig, ConfigError, PipelineConfig};
use rivalscope_jobs::{ApifyJobService, JobService};

use crate::completion::{CompletionService, OpenAiCompletionClient};
use crate::engagement::{FixedFollowerCount, FollowerCountProvider};
use crate::error::SetupError;
use crate::pipeline::AnalysisContext;
use crate::sources::ScraperRegistry;

/// Long-lived clients shared by every analysis run of a process.
#[derive(Clone)]
pub struct AnalysisServices {
    pub scrapers: ScraperRegistry,
    pub completion: Arc<dyn CompletionService>,
    pub followers: Arc<dyn FollowerCountProvider>,
    pub pipeline: PipelineConfig,
}

impl AnalysisServices {
    /// # Errors
    ///
    /// Returns [`SetupError::Config`] when `APIFY_TOKEN` or `OPENAI_API_KEY`
    /// is missing, or a client error if an HTTP client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, SetupError> {
        let apify_token = config
            .apify_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("APIFY_TOKEN".to_string()))?;
        let openai_key = config
            .openai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let jobs: Arc<dyn JobService> = Arc::new(ApifyJobService::new(
            &config.apify_base_url,
            apify_token,
            config.http_timeout_secs,
            config.http_max_retries,
            config.http_retry_backoff_base_secs,
        )?);
        let completion = OpenAiCompletionClient::new(
            &config.openai_base_url,
            openai_key,
            &config.openai_model,
            config.http_timeout_secs,
        )?;

        Ok(Self {
            scrapers: ScraperRegistry::apify(&jobs, &config.actor_ids, &config.pipeline),
            completion: Arc::new(completion),
            followers: Arc::new(FixedFollowerCount(config.pipeline.default_follower_count)),
            pipeline: config.pipeline.clone(),
        })
    }

    #[must_use]
    pub fn context<'a>(&'a self, store: &'a dyn AnalysisStore) -> AnalysisContext<'a> {
        AnalysisContext {
            store,
            scrapers: &self.scrapers,
            completion: self.completion.as_ref(),
            followers: self.followers.as_ref(),
            config: &self.pipeline,
        }
    }
}

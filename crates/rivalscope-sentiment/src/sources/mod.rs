//! Platform adapters.
//!
//! Each adapter turns one profile URL into canonical [`Post`]s with nested
//! [`Comment`]s. A failing adapter never fails the run: the orchestrator
//! records the failure in a [`PlatformReport`] and moves on to the next
//! platform.

mod facebook;
mod instagram;
mod profile;
mod tiktok;
mod youtube;

pub use facebook::FacebookScraper;
pub use instagram::InstagramScraper;
pub use profile::{brand_handle, canonical_profile_url, resolve_identifier};
pub use tiktok::TikTokScraper;
pub use youtube::YouTubeScraper;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rivalscope_core::{ActorIds, Comment, PipelineConfig, Platform, Post};
use rivalscope_jobs::{JobRunner, JobService, JobSpec, PollPolicy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ScrapeError;

#[async_trait]
pub trait Scraper: Send + Sync {
    fn platform(&self) -> Platform;

    /// Scrapes recent posts for `profile_url`.
    ///
    /// Returns an empty list, not an error, when the URL does not resolve to
    /// an account on this platform.
    async fn scrape(&self, profile_url: &str) -> Result<Vec<Post>, ScrapeError>;
}

/// Adapters keyed by the platform they serve.
#[derive(Clone, Default)]
pub struct ScraperRegistry {
    scrapers: BTreeMap<Platform, Arc<dyn Scraper>>,
}

impl ScraperRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `scraper`, replacing any adapter for the same platform.
    #[must_use]
    pub fn with(mut self, scraper: Arc<dyn Scraper>) -> Self {
        self.scrapers.insert(scraper.platform(), scraper);
        self
    }

    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<&dyn Scraper> {
        self.scrapers.get(&platform).map(Arc::as_ref)
    }

    /// All four platforms backed by job-service actors.
    #[must_use]
    pub fn apify(jobs: &Arc<dyn JobService>, actors: &ActorIds, config: &PipelineConfig) -> Self {
        let backend = |actor_id: &str| JobBackend::new(Arc::clone(jobs), actor_id, config);
        Self::new()
            .with(Arc::new(InstagramScraper::new(backend(&actors.instagram))))
            .with(Arc::new(FacebookScraper::new(backend(&actors.facebook))))
            .with(Arc::new(TikTokScraper::new(backend(&actors.tiktok))))
            .with(Arc::new(YouTubeScraper::new(backend(&actors.youtube))))
    }
}

/// Outcome of scraping one configured profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformReport {
    pub platform: Platform,
    /// False when no adapter is registered for the platform.
    pub attempted: bool,
    pub post_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs one platform's adapter and contains its failure.
pub(crate) async fn collect_platform(
    registry: &ScraperRegistry,
    platform: Platform,
    profile_url: &str,
) -> (PlatformReport, Vec<Post>) {
    let Some(scraper) = registry.get(platform) else {
        tracing::warn!(%platform, "no scraper registered for platform");
        let report = PlatformReport {
            platform,
            attempted: false,
            post_count: 0,
            error: Some("no scraper registered for this platform".to_string()),
        };
        return (report, Vec::new());
    };

    match scraper.scrape(profile_url).await {
        Ok(posts) => {
            tracing::info!(%platform, count = posts.len(), "collected posts");
            let report = PlatformReport {
                platform,
                attempted: true,
                post_count: posts.len(),
                error: None,
            };
            (report, posts)
        }
        Err(e) => {
            tracing::warn!(%platform, profile_url, error = %e, "platform scrape failed");
            let report = PlatformReport {
                platform,
                attempted: true,
                post_count: 0,
                error: Some(e.to_string()),
            };
            (report, Vec::new())
        }
    }
}

/// Submits scrape jobs for one actor and waits for their items.
pub(crate) struct JobBackend {
    jobs: Arc<dyn JobService>,
    actor_id: String,
    config: PipelineConfig,
}

impl JobBackend {
    pub(crate) fn new(jobs: Arc<dyn JobService>, actor_id: &str, config: &PipelineConfig) -> Self {
        Self {
            jobs,
            actor_id: actor_id.to_string(),
            config: config.clone(),
        }
    }

    pub(crate) fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub(crate) async fn run(
        &self,
        input: serde_json::Value,
    ) -> Result<Vec<serde_json::Value>, ScrapeError> {
        let policy = PollPolicy {
            interval: self.config.poll_interval,
            max_attempts: self.config.max_poll_attempts,
        };
        let spec = JobSpec {
            actor_id: self.actor_id.clone(),
            input,
        };
        Ok(JobRunner::new(self.jobs.as_ref(), policy).run(&spec).await?)
    }
}

// ---------------------------------------------------------------------------
// Normalization helpers shared by the adapters
// ---------------------------------------------------------------------------

/// Decodes raw items, keeping each item's original JSON alongside it.
/// Items that do not match the expected shape are skipped.
pub(crate) fn decode_items<T: DeserializeOwned>(
    platform: Platform,
    items: Vec<serde_json::Value>,
) -> Vec<(T, serde_json::Value)> {
    items
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<T>(raw.clone()) {
            Ok(item) => Some((item, raw)),
            Err(e) => {
                tracing::debug!(%platform, error = %e, "skipping undecodable item");
                None
            }
        })
        .collect()
}

/// Groups a flat stream by post key, keeping first-seen order of posts and
/// of items within each post.
pub(crate) fn group_by_post<T>(items: impl IntoIterator<Item = (String, T)>) -> Vec<(String, Vec<T>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();

    for (key, item) in items {
        if let Some(&i) = index.get(&key) {
            groups[i].1.push(item);
        } else {
            index.insert(key.clone(), groups.len());
            groups.push((key, vec![item]));
        }
    }

    groups
}

/// Applies the minimum-length filter, then the per-post cap.
pub(crate) fn finalize_comments(
    comments: impl IntoIterator<Item = Comment>,
    config: &PipelineConfig,
) -> Vec<Comment> {
    comments
        .into_iter()
        .filter(|c| config.accepts_comment(&c.text))
        .take(config.max_comments_per_post)
        .collect()
}

/// Case- and punctuation-insensitive match of a comment author against the
/// profile's own identifier.
pub(crate) fn is_brand_author(author: &str, identifier: &str) -> bool {
    let author = normalize_handle(author);
    !author.is_empty() && author == normalize_handle(identifier)
}

fn normalize_handle(handle: &str) -> String {
    handle
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Non-blank, trimmed text.
pub(crate) fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Counters arrive as numbers, numeric strings (`"1,204"`) or null.
/// Anything unparseable counts as zero.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().replace(',', "").parse().unwrap_or(0),
        _ => 0,
    })
}

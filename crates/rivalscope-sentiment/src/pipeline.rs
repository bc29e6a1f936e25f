//! Orchestration of one analysis run for one competitor.
//!
//! ```text
//! load competitor ─▶ scrape each platform ─▶ classify ─▶ persist ─▶ aggregate
//!        │                    │
//!        ▼                    ▼
//!  NoProfilesConfigured   NoPostsFound (per-platform diagnostics)
//! ```

use std::collections::HashSet;
use std::fmt::Write as _;

use futures::stream::{self, StreamExt};
use rivalscope_core::{AnalysisStore, Comment, PipelineConfig, Platform, Post, Statistics};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::compute_statistics;
use crate::classifier::SentimentBatcher;
use crate::completion::CompletionService;
use crate::engagement::{engagement_rate, FollowerCountProvider};
use crate::error::AnalysisError;
use crate::sources::{collect_platform, PlatformReport, ScraperRegistry};

/// Collaborators for a run. Everything is borrowed so callers can share
/// long-lived clients across runs.
pub struct AnalysisContext<'a> {
    pub store: &'a dyn AnalysisStore,
    pub scrapers: &'a ScraperRegistry,
    pub completion: &'a dyn CompletionService,
    pub followers: &'a dyn FollowerCountProvider,
    pub config: &'a PipelineConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub competitor_id: Uuid,
    pub run_id: Uuid,
    pub platforms: Vec<PlatformReport>,
    pub statistics: Statistics,
}

impl AnalysisSummary {
    #[must_use]
    pub fn message(&self) -> String {
        let s = &self.statistics;
        format!(
            "Analyzed {} posts and {} comments: {:.1}% positive, {:.1}% neutral, {:.1}% negative",
            s.total_posts,
            s.total_comments,
            s.positive_percentage,
            s.neutral_percentage,
            s.negative_percentage,
        )
    }
}

/// Runs the full analysis for `competitor_id`, recording results under `run_id`.
///
/// Individual platform, classification and comment-row failures are logged
/// and absorbed.
///
/// # Errors
///
/// - [`AnalysisError::CompetitorNotFound`] / [`AnalysisError::NoProfilesConfigured`]
///   before any scraping happens.
/// - [`AnalysisError::NoPostsFound`] when every platform came back empty.
/// - [`AnalysisError::Store`] when the competitor lookup or the statistics
///   insert fails.
pub async fn run_competitor_analysis(
    ctx: &AnalysisContext<'_>,
    competitor_id: Uuid,
    run_id: Uuid,
) -> Result<AnalysisSummary, AnalysisError> {
    ctx.config.validate()?;

    let competitor = ctx
        .store
        .load_competitor(competitor_id)
        .await?
        .ok_or(AnalysisError::CompetitorNotFound(competitor_id))?;

    if !competitor.has_profiles() {
        return Err(AnalysisError::NoProfilesConfigured);
    }

    tracing::info!(
        %competitor_id,
        %run_id,
        competitor = %competitor.name,
        platforms = competitor.profiles.len(),
        "starting competitor analysis"
    );

    // Owned items keep the fan-out future `Send`.
    let profiles: Vec<(Platform, String)> = competitor
        .configured_profiles()
        .map(|(platform, url)| (platform, url.to_string()))
        .collect();
    let scrapers = ctx.scrapers;
    let collected: Vec<(PlatformReport, Vec<Post>)> = stream::iter(profiles.clone())
        .map(move |(platform, url)| async move {
            collect_platform(scrapers, platform, &url).await
        })
        .buffered(ctx.config.max_concurrent_platforms.max(1))
        .collect()
        .await;

    let mut reports = Vec::with_capacity(collected.len());
    let mut posts = Vec::new();
    for ((platform, url), (report, mut platform_posts)) in profiles.into_iter().zip(collected) {
        if !platform_posts.is_empty() {
            let followers = ctx.followers.follower_count(platform, &url).await;
            for post in &mut platform_posts {
                post.engagement_rate =
                    engagement_rate(post.like_count, post.comment_count, followers);
            }
        }
        reports.push(report);
        posts.extend(platform_posts);
    }

    if posts.is_empty() {
        let err = AnalysisError::NoPostsFound { reports };
        tracing::error!(%competitor_id, %run_id, error = %err, "analysis found no posts");
        return Err(err);
    }

    let mut posts = dedupe_by_source_url(posts);

    let batcher = SentimentBatcher::new(ctx.completion, ctx.config);
    classify_captions(&batcher, ctx.config, &mut posts).await;

    let mut stored_posts: Vec<Post> = Vec::with_capacity(posts.len());
    let mut stored_comments: Vec<Comment> = Vec::new();

    for mut post in posts {
        let mut comments = std::mem::take(&mut post.comments);
        comments.retain(|c| ctx.config.accepts_comment(&c.text));

        let post_id = match ctx.store.upsert_post(run_id, competitor.id, &post).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    source_url = %post.source_url,
                    error = %e,
                    "failed to persist post, skipping it"
                );
                continue;
            }
        };

        let texts: Vec<String> = comments.iter().map(|c| c.text.clone()).collect();
        let results = batcher.classify(&texts).await;
        for (comment, sentiment) in comments.iter_mut().zip(results) {
            comment.sentiment = sentiment;
        }

        match ctx.store.insert_comments(run_id, post_id, &comments).await {
            Ok(positions) => {
                stored_comments.extend(positions.into_iter().filter_map(|i| comments.get(i).cloned()));
            }
            Err(e) => {
                tracing::warn!(
                    post_id,
                    error = %e,
                    "failed to persist comments for post"
                );
            }
        }

        stored_posts.push(post);
    }

    let statistics = compute_statistics(&stored_posts, &stored_comments);
    ctx.store.insert_statistics(run_id, &statistics).await?;

    let summary = AnalysisSummary {
        competitor_id,
        run_id,
        platforms: reports,
        statistics,
    };
    tracing::info!(%competitor_id, %run_id, summary = %summary.message(), "analysis complete");
    Ok(summary)
}

/// Keeps the first post seen for each `source_url`. A later duplicate would
/// reuse the stored row and replace the comments already counted for it.
fn dedupe_by_source_url(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|post| {
            let first = seen.insert(post.source_url.clone());
            if !first {
                tracing::debug!(source_url = %post.source_url, "dropping duplicate post");
            }
            first
        })
        .collect()
}

/// Captions shorter than the comment threshold stay neutral.
async fn classify_captions(batcher: &SentimentBatcher<'_>, config: &PipelineConfig, posts: &mut [Post]) {
    let eligible: Vec<(usize, String)> = posts
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            p.caption
                .as_deref()
                .filter(|c| config.accepts_comment(c))
                .map(|c| (i, c.to_string()))
        })
        .collect();
    if eligible.is_empty() {
        return;
    }

    let texts: Vec<String> = eligible.iter().map(|(_, text)| text.clone()).collect();
    let results = batcher.classify(&texts).await;
    for ((i, _), sentiment) in eligible.into_iter().zip(results) {
        posts[i].sentiment = sentiment;
    }
}

/// Diagnostic text for a run in which no platform produced posts.
pub(crate) fn zero_results_message(reports: &[PlatformReport]) -> String {
    let mut message =
        String::from("No posts were found on any configured social profile. Per platform:");
    for report in reports {
        let reason = match (&report.error, report.attempted) {
            (Some(err), _) => err.as_str(),
            (None, false) => "not attempted",
            (None, true) => "no posts found",
        };
        let _ = write!(message, "\n- {}: {reason}", report.platform);
    }
    message.push_str(
        "\nCheck that each profile URL points to a public account, that the account has \
         recent posts, and that the scraping service token is valid and has remaining credit.",
    );
    message
}

/// Result payload returned by every invocation entrypoint.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<PlatformReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvocationResponse {
    #[must_use]
    pub fn from_result(result: &Result<AnalysisSummary, AnalysisError>) -> Self {
        match result {
            Ok(summary) => Self {
                success: true,
                message: Some(summary.message()),
                statistics: Some(summary.statistics.clone()),
                platforms: summary.platforms.clone(),
                error: None,
            },
            Err(err) => Self::from_error(err),
        }
    }

    #[must_use]
    pub fn from_error(err: &AnalysisError) -> Self {
        Self {
            success: false,
            message: None,
            statistics: None,
            platforms: match err {
                AnalysisError::NoPostsFound { reports } => reports.clone(),
                _ => Vec::new(),
            },
            error: Some(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(platform: Platform, error: Option<&str>) -> PlatformReport {
        PlatformReport {
            platform,
            attempted: true,
            post_count: 0,
            error: error.map(ToString::to_string),
        }
    }

    #[test]
    fn dedupe_keeps_first_post_per_source_url() {
        let first = Post {
            caption: Some("first".into()),
            ..Post::new(Platform::Instagram, "https://ig/p/a")
        };
        let posts = vec![
            first,
            Post::new(Platform::Instagram, "https://ig/p/b"),
            Post {
                caption: Some("second".into()),
                ..Post::new(Platform::Instagram, "https://ig/p/a")
            },
        ];

        let kept = dedupe_by_source_url(posts);

        let urls: Vec<_> = kept.iter().map(|p| p.source_url.as_str()).collect();
        assert_eq!(urls, ["https://ig/p/a", "https://ig/p/b"]);
        assert_eq!(kept[0].caption.as_deref(), Some("first"));
    }

    #[test]
    fn zero_results_message_lists_each_platform() {
        let message = zero_results_message(&[
            report(Platform::Instagram, Some("job timed out locally")),
            report(Platform::TikTok, None),
        ]);
        assert!(message.contains("- instagram: job timed out locally"));
        assert!(message.contains("- tiktok: no posts found"));
        assert!(message.contains("public account"));
    }

    #[test]
    fn success_response_carries_message_and_statistics() {
        let summary = AnalysisSummary {
            competitor_id: Uuid::nil(),
            run_id: Uuid::nil(),
            platforms: vec![],
            statistics: Statistics {
                total_posts: 2,
                total_comments: 4,
                positive_percentage: 50.0,
                neutral_percentage: 25.0,
                negative_percentage: 25.0,
                ..Statistics::default()
            },
        };
        let response = InvocationResponse::from_result(&Ok(summary));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(
            json["message"],
            "Analyzed 2 posts and 4 comments: 50.0% positive, 25.0% neutral, 25.0% negative"
        );
        assert_eq!(json["statistics"]["total_comments"], 4);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_response_carries_error_only() {
        let response = InvocationResponse::from_result(&Err(AnalysisError::NoProfilesConfigured));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], false);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("no social profiles configured"));
        assert!(json.get("statistics").is_none());
        assert!(json.get("message").is_none());
    }
}

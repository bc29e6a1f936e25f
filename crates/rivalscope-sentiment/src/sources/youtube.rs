//! YouTube video comments, delivered as one flat item per comment.

use async_trait::async_trait;
use rivalscope_core::{Comment, PipelineConfig, Platform, Post};
use serde::Deserialize;
use serde_json::json;

use super::{
    brand_handle, canonical_profile_url, decode_items, finalize_comments, group_by_post,
    is_brand_author, lenient_count, non_blank, parse_timestamp, resolve_identifier, JobBackend,
    Scraper,
};
use crate::error::ScrapeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YouTubeCommentItem {
    page_url: Option<String>,
    title: Option<String>,
    comment: Option<String>,
    author: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    vote_count: i64,
    /// Only present when the actor emits absolute dates.
    date: Option<String>,
}

pub struct YouTubeScraper {
    backend: JobBackend,
}

impl YouTubeScraper {
    pub(crate) fn new(backend: JobBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Scraper for YouTubeScraper {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn scrape(&self, profile_url: &str) -> Result<Vec<Post>, ScrapeError> {
        let Some(channel) = resolve_identifier(Platform::YouTube, profile_url) else {
            tracing::warn!(profile_url, "could not resolve YouTube channel");
            return Ok(Vec::new());
        };

        let config = self.backend.config();
        let input = json!({
            "startUrls": [{"url": canonical_profile_url(Platform::YouTube, &channel)}],
            "maxVideos": config.max_posts_per_profile,
            "maxComments": config.max_comments_per_post,
            "commentsSortBy": "1",
        });
        let items = self.backend.run(input).await?;

        Ok(normalize(&channel, items, config))
    }
}

fn normalize(channel: &str, items: Vec<serde_json::Value>, config: &PipelineConfig) -> Vec<Post> {
    let brand = brand_handle(Platform::YouTube, channel);
    let keyed = decode_items::<YouTubeCommentItem>(Platform::YouTube, items)
        .into_iter()
        .filter_map(|(item, raw)| Some((non_blank(item.page_url.clone())?, (item, raw))));

    group_by_post(keyed)
        .into_iter()
        .take(config.max_posts_per_profile)
        .map(|(url, rows)| {
            let caption = rows
                .first()
                .and_then(|(item, _)| non_blank(item.title.clone()));
            let raw_payload = rows
                .first()
                .map(|(_, raw)| raw.clone())
                .unwrap_or_default();
            let comment_count = i64::try_from(rows.len()).unwrap_or(i64::MAX);

            let comments = rows.into_iter().filter_map(|(item, _)| {
                let text = non_blank(item.comment)?;
                let author = item.author.unwrap_or_default();
                Some(Comment {
                    is_response_from_brand: is_brand_author(&author, brand),
                    like_count: item.vote_count,
                    posted_at: parse_timestamp(item.date.as_deref()),
                    ..Comment::new(author, text)
                })
            });

            Post {
                caption,
                comment_count,
                raw_payload,
                comments: finalize_comments(comments, config),
                ..Post::new(Platform::YouTube, url)
            }
        })
        .collect()
}

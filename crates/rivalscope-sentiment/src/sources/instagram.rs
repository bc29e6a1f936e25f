//! Instagram posts with their latest comments nested per item.

use async_trait::async_trait;
use rivalscope_core::{Comment, Platform, Post};
use serde::Deserialize;
use serde_json::json;

use super::{
    canonical_profile_url, decode_items, finalize_comments, is_brand_author, lenient_count,
    non_blank, parse_timestamp, resolve_identifier, JobBackend, Scraper,
};
use crate::error::ScrapeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstagramPost {
    url: Option<String>,
    caption: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    likes_count: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    comments_count: i64,
    timestamp: Option<String>,
    #[serde(default)]
    latest_comments: Vec<InstagramComment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstagramComment {
    owner_username: Option<String>,
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    likes_count: i64,
    timestamp: Option<String>,
}

pub struct InstagramScraper {
    backend: JobBackend,
}

impl InstagramScraper {
    pub(crate) fn new(backend: JobBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Scraper for InstagramScraper {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn scrape(&self, profile_url: &str) -> Result<Vec<Post>, ScrapeError> {
        let Some(username) = resolve_identifier(Platform::Instagram, profile_url) else {
            tracing::warn!(profile_url, "could not resolve Instagram username");
            return Ok(Vec::new());
        };

        let config = self.backend.config();
        let input = json!({
            "directUrls": [canonical_profile_url(Platform::Instagram, &username)],
            "resultsType": "posts",
            "resultsLimit": config.max_posts_per_profile,
            "addParentData": false,
        });
        let items = self.backend.run(input).await?;

        Ok(normalize(&username, items, config))
    }
}

fn normalize(
    username: &str,
    items: Vec<serde_json::Value>,
    config: &rivalscope_core::PipelineConfig,
) -> Vec<Post> {
    decode_items::<InstagramPost>(Platform::Instagram, items)
        .into_iter()
        .filter_map(|(item, raw)| {
            let url = non_blank(item.url)?;
            let nested = item.latest_comments.len();
            let comments = item
                .latest_comments
                .into_iter()
                .filter_map(|c| {
                    let text = non_blank(c.text)?;
                    let author = c.owner_username.unwrap_or_default();
                    Some(Comment {
                        is_response_from_brand: is_brand_author(&author, username),
                        like_count: c.likes_count,
                        posted_at: parse_timestamp(c.timestamp.as_deref()),
                        ..Comment::new(author, text)
                    })
                });

            Some(Post {
                caption: non_blank(item.caption),
                like_count: item.likes_count,
                comment_count: item.comments_count.max(i64::try_from(nested).unwrap_or(i64::MAX)),
                posted_at: parse_timestamp(item.timestamp.as_deref()),
                comments: finalize_comments(comments, config),
                raw_payload: raw,
                ..Post::new(Platform::Instagram, url)
            })
        })
        .take(config.max_posts_per_profile)
        .collect()
}

//! TikTok videos with comments nested per item.

use async_trait::async_trait;
use rivalscope_core::{Comment, PipelineConfig, Platform, Post};
use serde::Deserialize;
use serde_json::json;

use super::{
    decode_items, finalize_comments, is_brand_author, lenient_count, non_blank, parse_timestamp,
    resolve_identifier, JobBackend, Scraper,
};
use crate::error::ScrapeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TikTokVideo {
    web_video_url: Option<String>,
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    digg_count: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    comment_count: i64,
    #[serde(rename = "createTimeISO")]
    create_time_iso: Option<String>,
    #[serde(default)]
    comments: Vec<TikTokComment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TikTokComment {
    unique_id: Option<String>,
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    digg_count: i64,
    #[serde(rename = "createTimeISO")]
    create_time_iso: Option<String>,
}

pub struct TikTokScraper {
    backend: JobBackend,
}

impl TikTokScraper {
    pub(crate) fn new(backend: JobBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Scraper for TikTokScraper {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    async fn scrape(&self, profile_url: &str) -> Result<Vec<Post>, ScrapeError> {
        let Some(handle) = resolve_identifier(Platform::TikTok, profile_url) else {
            tracing::warn!(profile_url, "could not resolve TikTok handle");
            return Ok(Vec::new());
        };

        let config = self.backend.config();
        let input = json!({
            "profiles": [handle],
            "resultsPerPage": config.max_posts_per_profile,
            "commentsPerPost": config.max_comments_per_post,
            "shouldDownloadVideos": false,
            "shouldDownloadCovers": false,
        });
        let items = self.backend.run(input).await?;

        Ok(normalize(&handle, items, config))
    }
}

fn normalize(handle: &str, items: Vec<serde_json::Value>, config: &PipelineConfig) -> Vec<Post> {
    decode_items::<TikTokVideo>(Platform::TikTok, items)
        .into_iter()
        .filter_map(|(video, raw)| {
            let url = non_blank(video.web_video_url)?;
            let comments = video.comments.into_iter().filter_map(|c| {
                let text = non_blank(c.text)?;
                let author = c.unique_id.unwrap_or_default();
                Some(Comment {
                    is_response_from_brand: is_brand_author(&author, handle),
                    like_count: c.digg_count,
                    posted_at: parse_timestamp(c.create_time_iso.as_deref()),
                    ..Comment::new(author, text)
                })
            });

            Some(Post {
                caption: non_blank(video.text),
                like_count: video.digg_count,
                comment_count: video.comment_count,
                posted_at: parse_timestamp(video.create_time_iso.as_deref()),
                comments: finalize_comments(comments, config),
                raw_payload: raw,
                ..Post::new(Platform::TikTok, url)
            })
        })
        .take(config.max_posts_per_profile)
        .collect()
}

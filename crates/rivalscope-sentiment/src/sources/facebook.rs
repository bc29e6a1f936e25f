//! Facebook page comments, delivered as one flat item per comment.

use async_trait::async_trait;
use rivalscope_core::{Comment, PipelineConfig, Platform, Post};
use serde::Deserialize;
use serde_json::json;

use super::{
    canonical_profile_url, decode_items, finalize_comments, group_by_post, is_brand_author,
    lenient_count, non_blank, parse_timestamp, resolve_identifier, JobBackend, Scraper,
};
use crate::error::ScrapeError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FacebookCommentItem {
    post_url: Option<String>,
    facebook_url: Option<String>,
    post_title: Option<String>,
    text: Option<String>,
    profile_name: Option<String>,
    /// Likes on the comment itself.
    #[serde(default, deserialize_with = "lenient_count")]
    likes_count: i64,
    /// Likes on the parent post, repeated on every row of that post.
    #[serde(default, deserialize_with = "lenient_count")]
    post_likes_count: i64,
    date: Option<String>,
}

impl FacebookCommentItem {
    fn post_key(&self) -> Option<String> {
        non_blank(self.post_url.clone()).or_else(|| non_blank(self.facebook_url.clone()))
    }
}

pub struct FacebookScraper {
    backend: JobBackend,
}

impl FacebookScraper {
    pub(crate) fn new(backend: JobBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Scraper for FacebookScraper {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn scrape(&self, profile_url: &str) -> Result<Vec<Post>, ScrapeError> {
        let Some(page) = resolve_identifier(Platform::Facebook, profile_url) else {
            tracing::warn!(profile_url, "could not resolve Facebook page");
            return Ok(Vec::new());
        };

        let config = self.backend.config();
        let input = json!({
            "startUrls": [{"url": canonical_profile_url(Platform::Facebook, &page)}],
            "resultsLimit": config.max_posts_per_profile * config.max_comments_per_post,
            "includeNestedComments": false,
        });
        let items = self.backend.run(input).await?;

        Ok(normalize(&page, items, config))
    }
}

fn normalize(page: &str, items: Vec<serde_json::Value>, config: &PipelineConfig) -> Vec<Post> {
    let keyed = decode_items::<FacebookCommentItem>(Platform::Facebook, items)
        .into_iter()
        .filter_map(|(item, raw)| Some((item.post_key()?, (item, raw))));

    group_by_post(keyed)
        .into_iter()
        .take(config.max_posts_per_profile)
        .map(|(url, rows)| {
            // The first-seen item carries the post-level fields.
            let caption = rows
                .first()
                .and_then(|(item, _)| non_blank(item.post_title.clone()));
            let like_count = rows.first().map_or(0, |(item, _)| item.post_likes_count);
            let raw_payload = rows
                .first()
                .map(|(_, raw)| raw.clone())
                .unwrap_or_default();
            let comment_count = i64::try_from(rows.len()).unwrap_or(i64::MAX);

            let comments = rows.into_iter().filter_map(|(item, _)| {
                let text = non_blank(item.text)?;
                let author = item.profile_name.unwrap_or_default();
                Some(Comment {
                    is_response_from_brand: is_brand_author(&author, page),
                    like_count: item.likes_count,
                    posted_at: parse_timestamp(item.date.as_deref()),
                    ..Comment::new(author, text)
                })
            });

            Post {
                caption,
                like_count,
                comment_count,
                raw_payload,
                comments: finalize_comments(comments, config),
                ..Post::new(Platform::Facebook, url)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(post: &str, author: &str, text: &str) -> serde_json::Value {
        json!({
            "postUrl": post,
            "postTitle": format!("Caption of {post}"),
            "text": text,
            "profileName": author,
            "likesCount": "4",
            "postLikesCount": 310,
            "date": "2024-02-10T09:00:00.000Z",
        })
    }

    #[test]
    fn groups_flat_rows_by_post_in_first_seen_order() {
        let items = vec![
            row("https://facebook.com/acme/posts/2", "Jane Doe", "Great coffee as always"),
            row("https://facebook.com/acme/posts/1", "John Roe", "Delivery took forever"),
            row("https://facebook.com/acme/posts/2", "Acme Coffee", "Thanks Jane, see you soon"),
        ];

        let posts = normalize("AcmeCoffee", items, &PipelineConfig::default());
        assert_eq!(posts.len(), 2);

        let first = &posts[0];
        assert_eq!(first.source_url, "https://facebook.com/acme/posts/2");
        assert_eq!(first.caption.as_deref(), Some("Caption of https://facebook.com/acme/posts/2"));
        assert_eq!(first.comment_count, 2);
        assert_eq!(first.like_count, 310);
        assert_eq!(first.raw_payload["profileName"], "Jane Doe");
        assert_eq!(first.comments.len(), 2);
        assert_eq!(first.comments[0].like_count, 4);
        assert!(!first.comments[0].is_response_from_brand);
        assert!(first.comments[1].is_response_from_brand);

        assert_eq!(posts[1].source_url, "https://facebook.com/acme/posts/1");
    }

    #[test]
    fn falls_back_to_facebook_url_and_drops_keyless_rows() {
        let items = vec![
            json!({"facebookUrl": "https://facebook.com/acme/posts/9", "text": "Where is the nearest store?"}),
            json!({"text": "orphan comment with no post"}),
        ];
        let posts = normalize("acme", items, &PipelineConfig::default());
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].source_url, "https://facebook.com/acme/posts/9");
        assert_eq!(posts[0].like_count, 0);
    }

    #[test]
    fn caps_posts_before_filtering_comments() {
        let config = PipelineConfig {
            max_posts_per_profile: 1,
            ..PipelineConfig::default()
        };
        let items = vec![
            row("https://facebook.com/acme/posts/1", "a", "short"),
            row("https://facebook.com/acme/posts/2", "b", "a perfectly long comment"),
        ];
        let posts = normalize("acme", items, &config);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].source_url, "https://facebook.com/acme/posts/1");
        assert!(posts[0].comments.is_empty());
    }
}

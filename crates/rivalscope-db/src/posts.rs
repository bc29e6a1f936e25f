//! Database operations for the `social_posts` table.
//!
//! `source_url` is the natural key. Re-scraping a known post reuses its row
//! and clears the comments hanging off it; the unique constraint is the only
//! concurrency control.

use chrono::{DateTime, Utc};
use rivalscope_core::Post;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub analysis_run_id: Uuid,
    pub competitor_id: Uuid,
    pub platform: String,
    pub source_url: String,
    pub caption: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub posted_at: Option<DateTime<Utc>>,
    pub engagement_rate: f64,
    pub sentiment_score: Decimal,
    pub sentiment_label: String,
    pub raw_payload: Value,
    pub created_at: DateTime<Utc>,
}

/// Sentiment scores are stored as `NUMERIC(4,3)`.
pub(crate) fn score_to_decimal(score: f64) -> Decimal {
    Decimal::from_f64_retain(score.clamp(-1.0, 1.0))
        .unwrap_or_default()
        .round_dp(3)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a post, or reuse the existing row with the same `source_url`.
///
/// On reuse the row moves to `run_id`, its scraped and sentiment columns are
/// refreshed and every comment attached to it is deleted, so the caller can
/// insert a fresh set. Both steps run in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn upsert_post(
    pool: &PgPool,
    run_id: Uuid,
    competitor_id: Uuid,
    post: &Post,
) -> Result<i64, DbError> {
    let mut tx = pool.begin().await?;

    // xmax = 0 only for a freshly inserted tuple.
    let (id, inserted): (i64, bool) = sqlx::query_as(
        "INSERT INTO social_posts \
             (analysis_run_id, competitor_id, platform, source_url, caption, like_count, \
              comment_count, posted_at, engagement_rate, sentiment_score, sentiment_label, \
              raw_payload) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (source_url) DO UPDATE SET \
             analysis_run_id = EXCLUDED.analysis_run_id, \
             caption = EXCLUDED.caption, \
             like_count = EXCLUDED.like_count, \
             comment_count = EXCLUDED.comment_count, \
             posted_at = EXCLUDED.posted_at, \
             engagement_rate = EXCLUDED.engagement_rate, \
             sentiment_score = EXCLUDED.sentiment_score, \
             sentiment_label = EXCLUDED.sentiment_label, \
             raw_payload = EXCLUDED.raw_payload \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(run_id)
    .bind(competitor_id)
    .bind(post.platform.as_str())
    .bind(&post.source_url)
    .bind(post.caption.as_deref())
    .bind(post.like_count)
    .bind(post.comment_count)
    .bind(post.posted_at)
    .bind(post.engagement_rate)
    .bind(score_to_decimal(post.sentiment.score))
    .bind(post.sentiment.label.as_str())
    .bind(&post.raw_payload)
    .fetch_one(&mut *tx)
    .await?;

    if !inserted {
        let deleted = sqlx::query("DELETE FROM social_comments WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tracing::debug!(post_id = id, deleted, "reusing existing post");
    }

    tx.commit().await?;
    Ok(id)
}

/// List every stored post for a competitor, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts_for_competitor(
    pool: &PgPool,
    competitor_id: Uuid,
) -> Result<Vec<PostRow>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(
        "SELECT id, analysis_run_id, competitor_id, platform, source_url, caption, like_count, \
                comment_count, posted_at, engagement_rate, sentiment_score, sentiment_label, \
                raw_payload, created_at \
         FROM social_posts \
         WHERE competitor_id = $1 \
         ORDER BY id",
    )
    .bind(competitor_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

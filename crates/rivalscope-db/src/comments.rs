//! Database operations for the `social_comments` table.

use chrono::{DateTime, Utc};
use rivalscope_core::Comment;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::posts::score_to_decimal;
use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub analysis_run_id: Uuid,
    pub position: i32,
    pub author_handle: String,
    pub text: String,
    pub like_count: i64,
    pub posted_at: Option<DateTime<Utc>>,
    pub sentiment_score: Decimal,
    pub sentiment_label: String,
    pub sentiment_explanation: String,
    pub keywords: Vec<String>,
    pub is_response_from_brand: bool,
}

/// Insert comments one row at a time, in order.
///
/// A row the database rejects is logged and skipped; the rest of the batch
/// is still written. Returns the positions (indexes into `comments`) that
/// were stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] for connection-level failures, which would fail
/// every remaining row as well.
pub async fn insert_comments(
    pool: &PgPool,
    run_id: Uuid,
    post_id: i64,
    comments: &[Comment],
) -> Result<Vec<usize>, DbError> {
    let mut stored = Vec::with_capacity(comments.len());

    for (position, comment) in comments.iter().enumerate() {
        let result = sqlx::query(
            "INSERT INTO social_comments \
                 (post_id, analysis_run_id, position, author_handle, text, like_count, \
                  posted_at, sentiment_score, sentiment_label, sentiment_explanation, \
                  keywords, is_response_from_brand) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(post_id)
        .bind(run_id)
        .bind(i32::try_from(position).unwrap_or(i32::MAX))
        .bind(&comment.author_handle)
        .bind(&comment.text)
        .bind(comment.like_count)
        .bind(comment.posted_at)
        .bind(score_to_decimal(comment.sentiment.score))
        .bind(comment.sentiment.label.as_str())
        .bind(&comment.sentiment.explanation)
        .bind(&comment.sentiment.keywords)
        .bind(comment.is_response_from_brand)
        .execute(pool)
        .await;

        match result {
            Ok(_) => stored.push(position),
            Err(sqlx::Error::Database(e)) => {
                tracing::warn!(post_id, position, error = %e, "comment insert failed, skipping row");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(stored)
}

/// Comments of a post in scrape order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_comments_for_post(pool: &PgPool, post_id: i64) -> Result<Vec<CommentRow>, DbError> {
    let rows = sqlx::query_as::<_, CommentRow>(
        "SELECT id, post_id, analysis_run_id, position, author_handle, text, like_count, \
                posted_at, sentiment_score, sentiment_label, sentiment_explanation, keywords, \
                is_response_from_brand \
         FROM social_comments \
         WHERE post_id = $1 \
         ORDER BY position, id",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

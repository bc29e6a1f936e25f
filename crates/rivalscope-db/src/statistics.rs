//! Database operations for the `competitor_statistics` table.

use rivalscope_core::{KeywordCount, Statistics};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct StatisticsRow {
    total_posts: i32,
    total_comments: i32,
    avg_sentiment_score: f64,
    positive_percentage: f64,
    neutral_percentage: f64,
    negative_percentage: f64,
    top_keywords: Json<Vec<KeywordCount>>,
    response_rate: f64,
    avg_engagement_rate: f64,
}

impl From<StatisticsRow> for Statistics {
    fn from(row: StatisticsRow) -> Self {
        Statistics {
            total_posts: u32::try_from(row.total_posts).unwrap_or_default(),
            total_comments: u32::try_from(row.total_comments).unwrap_or_default(),
            avg_sentiment_score: row.avg_sentiment_score,
            positive_percentage: row.positive_percentage,
            neutral_percentage: row.neutral_percentage,
            negative_percentage: row.negative_percentage,
            top_keywords: row.top_keywords.0,
            response_rate: row.response_rate,
            avg_engagement_rate: row.avg_engagement_rate,
        }
    }
}

/// Insert the statistics row for a run. Each run has at most one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including the unique
/// violation raised when the run already has statistics.
pub async fn insert_statistics(
    pool: &PgPool,
    run_id: Uuid,
    stats: &Statistics,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO competitor_statistics \
             (analysis_run_id, total_posts, total_comments, avg_sentiment_score, \
              positive_percentage, neutral_percentage, negative_percentage, top_keywords, \
              response_rate, avg_engagement_rate) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(run_id)
    .bind(i32::try_from(stats.total_posts).unwrap_or(i32::MAX))
    .bind(i32::try_from(stats.total_comments).unwrap_or(i32::MAX))
    .bind(stats.avg_sentiment_score)
    .bind(stats.positive_percentage)
    .bind(stats.neutral_percentage)
    .bind(stats.negative_percentage)
    .bind(Json(&stats.top_keywords))
    .bind(stats.response_rate)
    .bind(stats.avg_engagement_rate)
    .execute(pool)
    .await?;

    Ok(())
}

/// Statistics recorded for `run_id`, or `None` if the run has none yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_statistics_for_run(
    pool: &PgPool,
    run_id: Uuid,
) -> Result<Option<Statistics>, DbError> {
    let row = sqlx::query_as::<_, StatisticsRow>(
        "SELECT total_posts, total_comments, avg_sentiment_score, positive_percentage, \
                neutral_percentage, negative_percentage, top_keywords, response_rate, \
                avg_engagement_rate \
         FROM competitor_statistics \
         WHERE analysis_run_id = $1",
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Statistics::from))
}

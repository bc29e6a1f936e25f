//! Database operations for the `analysis_runs` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisRunRow {
    pub id: Uuid,
    pub competitor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Insert a new analysis run for `competitor_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the competitor does not exist, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn create_analysis_run(
    pool: &PgPool,
    competitor_id: Uuid,
) -> Result<AnalysisRunRow, DbError> {
    let result = sqlx::query_as::<_, AnalysisRunRow>(
        "INSERT INTO analysis_runs (competitor_id) \
         VALUES ($1) \
         RETURNING id, competitor_id, created_at",
    )
    .bind(competitor_id)
    .fetch_one(pool)
    .await
    .map_err(DbError::from);

    match result {
        Err(e) if e.is_foreign_key_violation() => Err(DbError::NotFound),
        other => other,
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_analysis_run(pool: &PgPool, id: Uuid) -> Result<Option<AnalysisRunRow>, DbError> {
    let row = sqlx::query_as::<_, AnalysisRunRow>(
        "SELECT id, competitor_id, created_at FROM analysis_runs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

//! Read-only access to the `competitors` table.

use chrono::{DateTime, Utc};
use rivalscope_core::{Competitor, Platform};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompetitorRow {
    pub id: Uuid,
    pub name: String,
    pub instagram_url: Option<String>,
    pub facebook_url: Option<String>,
    pub tiktok_url: Option<String>,
    pub youtube_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CompetitorRow> for Competitor {
    fn from(row: CompetitorRow) -> Self {
        Competitor::new(row.id, row.name)
            .with_profile(Platform::Instagram, row.instagram_url.as_deref())
            .with_profile(Platform::Facebook, row.facebook_url.as_deref())
            .with_profile(Platform::TikTok, row.tiktok_url.as_deref())
            .with_profile(Platform::YouTube, row.youtube_url.as_deref())
    }
}

/// Fetch a competitor by id, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_competitor(pool: &PgPool, id: Uuid) -> Result<Option<CompetitorRow>, DbError> {
    let row = sqlx::query_as::<_, CompetitorRow>(
        "SELECT id, name, instagram_url, facebook_url, tiktok_url, youtube_url, created_at \
         FROM competitors \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

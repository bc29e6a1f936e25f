use async_trait::async_trait;
use rivalscope_core::{AnalysisStore, Comment, Competitor, Post, PostId, Statistics, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{comments, competitors, posts, statistics, DbError};

/// [`AnalysisStore`] over Postgres.
#[derive(Debug, Clone)]
pub struct PgAnalysisStore {
    pool: PgPool,
}

impl PgAnalysisStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::backend(err)
    }
}

fn run_scoped(err: DbError, run_id: Uuid) -> StoreError {
    if err.is_foreign_key_violation() {
        StoreError::RunNotFound(run_id)
    } else {
        err.into()
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn load_competitor(&self, competitor_id: Uuid) -> Result<Option<Competitor>, StoreError> {
        let row = competitors::get_competitor(&self.pool, competitor_id).await?;
        Ok(row.map(Competitor::from))
    }

    async fn upsert_post(
        &self,
        run_id: Uuid,
        competitor_id: Uuid,
        post: &Post,
    ) -> Result<PostId, StoreError> {
        posts::upsert_post(&self.pool, run_id, competitor_id, post)
            .await
            .map_err(|e| run_scoped(e, run_id))
    }

    async fn insert_comments(
        &self,
        run_id: Uuid,
        post_id: PostId,
        comments: &[Comment],
    ) -> Result<Vec<usize>, StoreError> {
        comments::insert_comments(&self.pool, run_id, post_id, comments)
            .await
            .map_err(|e| run_scoped(e, run_id))
    }

    async fn insert_statistics(&self, run_id: Uuid, stats: &Statistics) -> Result<(), StoreError> {
        statistics::insert_statistics(&self.pool, run_id, stats)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    StoreError::DuplicateStatistics(run_id)
                } else {
                    run_scoped(e, run_id)
                }
            })
    }
}

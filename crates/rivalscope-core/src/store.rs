//! Persistence contract used by the analysis pipeline.
//!
//! The Postgres implementation lives in `rivalscope-db`; [`crate::MemoryStore`]
//! backs dry runs and tests.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Comment, Competitor, Post, Statistics};

pub type PostId = i64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("analysis run {0} not found")]
    RunNotFound(Uuid),

    #[error("statistics already recorded for analysis run {0}")]
    DuplicateStatistics(Uuid),

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Read-only lookup of a competitor and its configured profile URLs.
    async fn load_competitor(&self, competitor_id: Uuid) -> Result<Option<Competitor>, StoreError>;

    /// Inserts a post keyed by `source_url`.
    ///
    /// When a row with the same `source_url` already exists its id is reused,
    /// it is reassigned to `run_id` with the new post fields, and every
    /// comment attached to it is deleted.
    async fn upsert_post(
        &self,
        run_id: Uuid,
        competitor_id: Uuid,
        post: &Post,
    ) -> Result<PostId, StoreError>;

    /// Inserts comments in order. A failing row is logged and skipped.
    ///
    /// Returns the positions (into `comments`) of the rows that were stored.
    async fn insert_comments(
        &self,
        run_id: Uuid,
        post_id: PostId,
        comments: &[Comment],
    ) -> Result<Vec<usize>, StoreError>;

    /// Inserts the single statistics row for a run. Not an upsert.
    async fn insert_statistics(&self, run_id: Uuid, stats: &Statistics) -> Result<(), StoreError>;
}

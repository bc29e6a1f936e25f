//! In-process [`AnalysisStore`] with the same uniqueness rules as the
//! Postgres schema: `source_url` is unique, comments cascade with their
//! post and each run gets at most one statistics row.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{Comment, Competitor, Post, Statistics};
use crate::store::{AnalysisStore, PostId, StoreError};

#[derive(Debug, Clone)]
pub struct StoredPost {
    pub id: PostId,
    pub run_id: Uuid,
    pub competitor_id: Uuid,
    pub post: Post,
}

#[derive(Debug, Clone)]
pub struct StoredComment {
    pub id: i64,
    pub post_id: PostId,
    pub run_id: Uuid,
    pub comment: Comment,
}

#[derive(Debug, Default)]
struct Inner {
    competitors: HashMap<Uuid, Competitor>,
    posts: Vec<StoredPost>,
    comments: Vec<StoredComment>,
    statistics: HashMap<Uuid, Statistics>,
    next_post_id: PostId,
    next_comment_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a competitor for [`AnalysisStore::load_competitor`].
    pub fn add_competitor(&self, competitor: Competitor) {
        self.lock().competitors.insert(competitor.id, competitor);
    }

    #[must_use]
    pub fn post_count(&self) -> usize {
        self.lock().posts.len()
    }

    #[must_use]
    pub fn posts(&self) -> Vec<StoredPost> {
        self.lock().posts.clone()
    }

    /// Comments attached to `post_id`, in insertion order.
    #[must_use]
    pub fn comments_for(&self, post_id: PostId) -> Vec<StoredComment> {
        self.lock()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn all_comments(&self) -> Vec<StoredComment> {
        self.lock().comments.clone()
    }

    #[must_use]
    pub fn statistics_for(&self, run_id: Uuid) -> Option<Statistics> {
        self.lock().statistics.get(&run_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn load_competitor(&self, competitor_id: Uuid) -> Result<Option<Competitor>, StoreError> {
        Ok(self.lock().competitors.get(&competitor_id).cloned())
    }

    async fn upsert_post(
        &self,
        run_id: Uuid,
        competitor_id: Uuid,
        post: &Post,
    ) -> Result<PostId, StoreError> {
        let mut inner = self.lock();
        let mut stored = post.clone();
        stored.comments.clear();

        if let Some(existing) = inner
            .posts
            .iter_mut()
            .find(|p| p.post.source_url == post.source_url)
        {
            let id = existing.id;
            existing.run_id = run_id;
            stored.platform = existing.post.platform;
            existing.post = stored;
            inner.comments.retain(|c| c.post_id != id);
            return Ok(id);
        }

        inner.next_post_id += 1;
        let id = inner.next_post_id;
        inner.posts.push(StoredPost {
            id,
            run_id,
            competitor_id,
            post: stored,
        });
        Ok(id)
    }

    async fn insert_comments(
        &self,
        run_id: Uuid,
        post_id: PostId,
        comments: &[Comment],
    ) -> Result<Vec<usize>, StoreError> {
        let mut inner = self.lock();
        let mut persisted = Vec::with_capacity(comments.len());

        for (position, comment) in comments.iter().enumerate() {
            inner.next_comment_id += 1;
            let id = inner.next_comment_id;
            inner.comments.push(StoredComment {
                id,
                post_id,
                run_id,
                comment: comment.clone(),
            });
            persisted.push(position);
        }

        Ok(persisted)
    }

    async fn insert_statistics(&self, run_id: Uuid, stats: &Statistics) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.statistics.contains_key(&run_id) {
            return Err(StoreError::DuplicateStatistics(run_id));
        }
        inner.statistics.insert(run_id, stats.clone());
        Ok(())
    }
}

use async_trait::async_trait;
use rivalscope_core::Platform;

/// Source of a profile's follower count, used as the engagement denominator.
#[async_trait]
pub trait FollowerCountProvider: Send + Sync {
    async fn follower_count(&self, platform: Platform, profile_url: &str) -> Option<u64>;
}

/// Same follower count for every profile.
#[derive(Debug, Clone, Copy)]
pub struct FixedFollowerCount(pub u64);

#[async_trait]
impl FollowerCountProvider for FixedFollowerCount {
    async fn follower_count(&self, _platform: Platform, _profile_url: &str) -> Option<u64> {
        Some(self.0)
    }
}

/// `(likes + comments) / followers * 100`. Zero when followers are unknown.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn engagement_rate(like_count: i64, comment_count: i64, followers: Option<u64>) -> f64 {
    match followers {
        Some(followers) if followers > 0 => {
            let interactions = like_count.max(0).saturating_add(comment_count.max(0));
            interactions as f64 / followers as f64 * 100.0
        }
        _ => 0.0,
    }
}

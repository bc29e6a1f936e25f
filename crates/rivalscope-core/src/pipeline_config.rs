use std::time::Duration;

use crate::ConfigError;

/// Tunables for one analysis run.
///
/// Passed explicitly to every stage so tests can drive boundary values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_posts_per_profile: usize,
    pub max_comments_per_post: usize,
    /// Minimum trimmed length, in characters, for a comment to be kept.
    pub min_comment_length: usize,
    pub classification_chunk_size: usize,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    /// `1` scrapes platforms one after another.
    pub max_concurrent_platforms: usize,
    /// `1` classifies chunks one after another.
    pub max_concurrent_chunks: usize,
    /// Follower count used when no real figure is available.
    pub default_follower_count: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_posts_per_profile: 10,
            max_comments_per_post: 50,
            min_comment_length: 10,
            classification_chunk_size: 20,
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 60,
            max_concurrent_platforms: 1,
            max_concurrent_chunks: 1,
            default_follower_count: 10_000,
        }
    }
}

impl PipelineConfig {
    /// Rejects values that would stall or divide by zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero_fields = [
            ("classification_chunk_size", self.classification_chunk_size == 0),
            ("max_poll_attempts", self.max_poll_attempts == 0),
            ("max_concurrent_platforms", self.max_concurrent_platforms == 0),
            ("max_concurrent_chunks", self.max_concurrent_chunks == 0),
        ];

        for (field, is_zero) in zero_fields {
            if is_zero {
                return Err(ConfigError::Validation(format!("{field} must be at least 1")));
            }
        }

        Ok(())
    }

    /// Whether `text` survives the minimum-length filter.
    #[must_use]
    pub fn accepts_comment(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.min_comment_length
    }
}

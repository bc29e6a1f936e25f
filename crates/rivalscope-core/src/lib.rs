//! Shared model, configuration and storage contract for the competitor
//! social-sentiment pipeline.

pub mod app_config;
pub mod config;
pub mod memory;
pub mod model;
pub mod pipeline_config;
pub mod store;

pub use app_config::{ActorIds, AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use memory::MemoryStore;
pub use model::{
    Comment, Competitor, KeywordCount, Platform, Post, SentimentLabel, SentimentResult,
    Statistics,
};
pub use pipeline_config::PipelineConfig;
pub use store::{AnalysisStore, PostId, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("invalid pipeline configuration: {0}")]
    Validation(String),
}

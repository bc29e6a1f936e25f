//! Competitor social-sentiment analysis.
//!
//! Scrapes a competitor's social profiles through per-platform adapters,
//! classifies captions and comments with a hosted completion service,
//! persists the results idempotently and aggregates run statistics.

pub mod aggregate;
pub mod classifier;
pub mod completion;
pub mod engagement;
pub mod error;
pub mod pipeline;
pub mod services;
pub mod sources;

pub use aggregate::compute_statistics;
pub use classifier::SentimentBatcher;
pub use completion::{CompletionService, OpenAiCompletionClient};
pub use engagement::{FixedFollowerCount, FollowerCountProvider};
pub use error::{AnalysisError, CompletionError, ScrapeError, SetupError};
pub use pipeline::{run_competitor_analysis, AnalysisContext, AnalysisSummary, InvocationResponse};
pub use services::AnalysisServices;
pub use sources::{PlatformReport, Scraper, ScraperRegistry};

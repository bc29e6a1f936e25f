//! Submit → poll → fetch lifecycle for third-party scraping jobs.
//!
//! [`JobService`] is the platform-agnostic wire contract, [`ApifyJobService`]
//! speaks the Apify actor-run REST API, and [`JobRunner`] drives a job to a
//! terminal state under a bounded [`PollPolicy`].

pub mod apify;
pub mod error;
pub mod runner;
pub mod types;

mod retry;

pub use apify::ApifyJobService;
pub use error::JobError;
pub use runner::{JobRunner, JobState, PollPolicy};
pub use types::{JobId, JobService, JobSpec, JobStatus};

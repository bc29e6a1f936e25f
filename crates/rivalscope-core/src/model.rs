//! Canonical records shared by every adapter, the classifier, the store and
//! the aggregation step. Nothing here knows about a specific platform's wire
//! format.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported social platforms.
///
/// The declaration order is the deterministic order in which a competitor's
/// profiles are scraped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    TikTok,
    YouTube,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Instagram,
        Platform::Facebook,
        Platform::TikTok,
        Platform::YouTube,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::TikTok => "tiktok",
            Platform::YouTube => "youtube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            "tiktok" => Ok(Platform::TikTok),
            "youtube" => Ok(Platform::YouTube),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// A tracked competitor. Owned by the CRM; the pipeline only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competitor {
    pub id: Uuid,
    pub name: String,
    /// Profile URL per platform. Blank URLs are never stored here.
    pub profiles: BTreeMap<Platform, String>,
}

impl Competitor {
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            profiles: BTreeMap::new(),
        }
    }

    /// Adds a profile URL, ignoring blank values.
    #[must_use]
    pub fn with_profile(mut self, platform: Platform, url: Option<&str>) -> Self {
        if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
            self.profiles.insert(platform, url.to_string());
        }
        self
    }

    /// Configured profiles in scrape order.
    pub fn configured_profiles(&self) -> impl Iterator<Item = (Platform, &str)> {
        self.profiles.iter().map(|(p, url)| (*p, url.as_str()))
    }

    #[must_use]
    pub fn has_profiles(&self) -> bool {
        !self.profiles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }

    /// Parses a label case-insensitively. Returns `None` for anything outside
    /// the three-valued set.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "neutral" => Some(SentimentLabel::Neutral),
            "negative" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured classification for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// In `[-1.0, 1.0]`.
    pub score: f64,
    pub label: SentimentLabel,
    pub explanation: String,
    pub keywords: Vec<String>,
}

impl SentimentResult {
    /// The fallback used whenever classification is unavailable.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
            explanation: String::new(),
            keywords: Vec::new(),
        }
    }
}

impl Default for SentimentResult {
    fn default() -> Self {
        Self::neutral()
    }
}

/// A post discovered on a competitor's profile, with its comments nested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub platform: Platform,
    /// Natural key. Unique across the whole datastore.
    pub source_url: String,
    pub caption: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub posted_at: Option<DateTime<Utc>>,
    /// Percentage of followers that engaged. Filled in by the orchestrator.
    pub engagement_rate: f64,
    /// Caption sentiment; only `score` and `label` are persisted.
    pub sentiment: SentimentResult,
    pub raw_payload: serde_json::Value,
    pub comments: Vec<Comment>,
}

impl Post {
    #[must_use]
    pub fn new(platform: Platform, source_url: impl Into<String>) -> Self {
        Self {
            platform,
            source_url: source_url.into(),
            caption: None,
            like_count: 0,
            comment_count: 0,
            posted_at: None,
            engagement_rate: 0.0,
            sentiment: SentimentResult::neutral(),
            raw_payload: serde_json::Value::Null,
            comments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub author_handle: String,
    pub text: String,
    pub like_count: i64,
    pub posted_at: Option<DateTime<Utc>>,
    pub sentiment: SentimentResult,
    pub is_response_from_brand: bool,
}

impl Comment {
    #[must_use]
    pub fn new(author_handle: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author_handle: author_handle.into(),
            text: text.into(),
            like_count: 0,
            posted_at: None,
            sentiment: SentimentResult::neutral(),
            is_response_from_brand: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u32,
}

/// Aggregate figures for one analysis run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total_posts: u32,
    pub total_comments: u32,
    pub avg_sentiment_score: f64,
    pub positive_percentage: f64,
    pub neutral_percentage: f64,
    pub negative_percentage: f64,
    /// Ranked by count, ties in first-seen order. At most ten entries.
    pub top_keywords: Vec<KeywordCount>,
    /// Percentage of comments written by the competitor's own account.
    pub response_rate: f64,
    pub avg_engagement_rate: f64,
}

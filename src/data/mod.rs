//! Core data models and provider adapters for Trend Radar
//!
//! This module contains the data types shared by every signal source
//! (time series, headlines, posts) and the [`SignalSource`] trait that each
//! provider adapter implements.

pub mod news;
pub mod pageviews;
pub mod social;
pub mod trends;

pub use news::NewsClient;
pub use pageviews::{canonical_article_title, PageviewsClient};
pub use social::{top_terms, BlueskyClient};
pub use trends::TrendsClient;

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies one of the four providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceId {
    /// Google Trends search-interest index
    SearchInterest,
    /// Google News RSS headlines
    News,
    /// Wikipedia pageviews
    Pageviews,
    /// Bluesky posts
    Social,
}

impl SourceId {
    /// All sources in dashboard order
    pub const ALL: [SourceId; 4] = [
        SourceId::SearchInterest,
        SourceId::News,
        SourceId::Pageviews,
        SourceId::Social,
    ];

    /// Stable short name used in cache keys, log fields and export filenames
    pub fn slug(&self) -> &'static str {
        match self {
            SourceId::SearchInterest => "trends",
            SourceId::News => "news",
            SourceId::Pageviews => "wikipedia",
            SourceId::Social => "bluesky",
        }
    }

    /// Human-readable provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceId::SearchInterest => "Google Trends",
            SourceId::News => "Google News",
            SourceId::Pageviews => "Wikipedia",
            SourceId::Social => "Bluesky",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Login pair for providers that require one (only Bluesky today)
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account handle or identifier
    pub principal: String,
    /// App password
    pub secret: String,
}

impl Credentials {
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }

    /// Builds credentials only when both halves are present and non-blank
    pub fn from_parts(principal: Option<String>, secret: Option<String>) -> Option<Self> {
        let principal = principal?.trim().to_string();
        let secret = secret?.trim().to_string();
        if principal.is_empty() || secret.is_empty() {
            return None;
        }
        Some(Self { principal, secret })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One dated value of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: u64,
}

/// Ordered, finite sequence of daily values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn new(points: Vec<SeriesPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The most recent point
    pub fn latest(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Sum of all values
    pub fn total(&self) -> u64 {
        self.points.iter().map(|p| p.value).sum()
    }

    /// Largest value, or 0 for an empty series
    pub fn max(&self) -> u64 {
        self.points.iter().map(|p| p.value).max().unwrap_or(0)
    }

    pub fn values(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// A news headline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub link: String,
    pub published_at: Option<String>,
}

/// Daily views of the article resolved from a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleViews {
    /// Canonical article title the topic resolved to
    pub article: String,
    pub series: TimeSeries,
}

/// A social network post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub author: String,
    pub text: String,
}

/// Errors a provider adapter can report
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with an unexpected status code
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Failed to parse the provider response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Provider rejected the supplied credentials
    #[error("Authentication rejected: {0}")]
    Auth(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}

/// A remote provider of one category of signal
///
/// `fetch` returns `Ok(None)` when the provider was reached but had nothing
/// for the topic, and `Err` when the call itself went wrong.
#[async_trait]
pub trait SignalSource: Send + Sync {
    type Output: Send + Sync + 'static;

    fn id(&self) -> SourceId;

    /// Call-affecting parameters besides the topic (locale, window, limits)
    fn params(&self) -> Vec<String> {
        Vec::new()
    }

    async fn fetch(
        &self,
        topic: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Option<Self::Output>, SourceError>;
}

/// Builds the shared HTTP client with an explicit request timeout
pub fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, SourceError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!(
            "trendradar/",
            env!("CARGO_PKG_VERSION"),
            " (terminal dashboard)"
        ))
        .connect_timeout(timeout.min(std::time::Duration::from_secs(5)))
        .timeout(timeout)
        .cookie_store(true)
        .build()?;
    Ok(client)
}

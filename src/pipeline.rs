//! Fetch pipeline
//!
//! Owns one [`CachedFetcher`] per signal source and runs all four for a topic
//! concurrently, producing a [`Snapshot`] for the dashboard and exporters.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::cache::{CachedFetcher, Clock, FetchResult, SystemClock};
use crate::config::{CacheTtls, Settings};
use crate::data::{
    http_client, ArticleViews, BlueskyClient, Credentials, Headline, NewsClient, PageviewsClient,
    Post, SignalSource, SourceError, SourceId, TimeSeries, TrendsClient,
};

/// Outer per-call bound, as a multiple of the HTTP request timeout
///
/// Search interest makes three sequential requests per call.
const CALL_TIMEOUT_FACTOR: u32 = 3;

/// The four provider adapters a pipeline fetches from
pub struct Sources {
    pub trends: Arc<dyn SignalSource<Output = TimeSeries>>,
    pub news: Arc<dyn SignalSource<Output = Vec<Headline>>>,
    pub pageviews: Arc<dyn SignalSource<Output = ArticleViews>>,
    pub social: Arc<dyn SignalSource<Output = Vec<Post>>>,
}

impl Sources {
    /// Builds the live HTTP adapters from settings
    pub fn from_settings(settings: &Settings) -> Result<Self, SourceError> {
        let client = http_client(settings.request_timeout())?;
        let locale = &settings.locale;

        Ok(Self {
            trends: Arc::new(
                TrendsClient::new(client.clone())
                    .with_locale(&locale.trends_hl, &locale.trends_geo, locale.trends_tz)
                    .with_timeframe(&locale.trends_timeframe),
            ),
            news: Arc::new(
                NewsClient::new(client.clone())
                    .with_locale(&locale.news_hl, &locale.news_gl, &locale.news_ceid)
                    .with_limit(settings.news_limit),
            ),
            pageviews: Arc::new(
                PageviewsClient::new(client.clone())
                    .with_project(&locale.wiki_project)
                    .with_window_days(settings.window_days),
            ),
            social: Arc::new(BlueskyClient::new(client).with_limit(settings.social_limit)),
        })
    }
}

/// Every source's result for one topic at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub topic: String,
    pub taken_at: DateTime<Local>,
    pub trends: FetchResult<TimeSeries>,
    pub news: FetchResult<Vec<Headline>>,
    pub pageviews: FetchResult<ArticleViews>,
    pub social: FetchResult<Vec<Post>>,
}

impl Snapshot {
    /// A snapshot where every source is `Empty`
    pub fn empty(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            taken_at: Local::now(),
            trends: FetchResult::Empty,
            news: FetchResult::Empty,
            pageviews: FetchResult::Empty,
            social: FetchResult::Empty,
        }
    }

    /// Failure reason for a source, if it failed
    pub fn failure(&self, source: SourceId) -> Option<&str> {
        let reason = match source {
            SourceId::SearchInterest => failed_reason(&self.trends),
            SourceId::News => failed_reason(&self.news),
            SourceId::Pageviews => failed_reason(&self.pageviews),
            SourceId::Social => failed_reason(&self.social),
        };
        reason.map(String::as_str)
    }

    /// Sources that returned data
    pub fn populated(&self) -> Vec<SourceId> {
        SourceId::ALL
            .into_iter()
            .filter(|source| match source {
                SourceId::SearchInterest => self.trends.is_data(),
                SourceId::News => self.news.is_data(),
                SourceId::Pageviews => self.pageviews.is_data(),
                SourceId::Social => self.social.is_data(),
            })
            .collect()
    }
}

fn failed_reason<T>(result: &FetchResult<T>) -> Option<&String> {
    match result {
        FetchResult::Failed(reason) => Some(reason),
        _ => None,
    }
}

fn bounded<T: Send + Sync + 'static>(
    fetcher: CachedFetcher<T>,
    timeout: Option<Duration>,
) -> CachedFetcher<T> {
    match timeout {
        Some(limit) => fetcher.with_timeout(limit),
        None => fetcher,
    }
}

/// Cached fetchers for all four sources
pub struct Pipeline {
    trends: CachedFetcher<TimeSeries>,
    news: CachedFetcher<Vec<Headline>>,
    pageviews: CachedFetcher<ArticleViews>,
    social: CachedFetcher<Vec<Post>>,
}

impl Pipeline {
    /// Builds a pipeline over the live providers configured in `settings`
    pub fn new(settings: &Settings) -> Result<Self, SourceError> {
        let sources = Sources::from_settings(settings)?;
        let timeout = settings.request_timeout() * CALL_TIMEOUT_FACTOR;
        Ok(Self::from_sources(
            sources,
            settings.ttl,
            Arc::new(SystemClock),
            Some(timeout),
        ))
    }

    /// Builds a pipeline over arbitrary adapters
    pub fn from_sources(
        sources: Sources,
        ttls: CacheTtls,
        clock: Arc<dyn Clock>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            trends: bounded(
                CachedFetcher::with_clock(sources.trends, ttls.trends(), clock.clone()),
                timeout,
            ),
            news: bounded(
                CachedFetcher::with_clock(sources.news, ttls.news(), clock.clone()),
                timeout,
            ),
            pageviews: bounded(
                CachedFetcher::with_clock(sources.pageviews, ttls.pageviews(), clock.clone()),
                timeout,
            ),
            social: bounded(
                CachedFetcher::with_clock(sources.social, ttls.social(), clock),
                timeout,
            ),
        }
    }

    pub async fn search_interest(&self, topic: &str) -> FetchResult<TimeSeries> {
        self.trends.fetch(topic, None).await
    }

    pub async fn news_headlines(&self, topic: &str) -> FetchResult<Vec<Headline>> {
        self.news.fetch(topic, None).await
    }

    pub async fn pageviews(&self, topic: &str) -> FetchResult<ArticleViews> {
        self.pageviews.fetch(topic, None).await
    }

    /// Posts for the topic; `Empty` without touching cache or network when
    /// no credentials are configured
    pub async fn social_posts(
        &self,
        topic: &str,
        credentials: Option<&Credentials>,
    ) -> FetchResult<Vec<Post>> {
        match credentials {
            Some(credentials) => self.social.fetch(topic, Some(credentials)).await,
            None => {
                debug!(topic, "social credentials missing");
                FetchResult::Empty
            }
        }
    }

    /// Fetches all four sources concurrently
    pub async fn run(&self, topic: &str, credentials: Option<&Credentials>) -> Snapshot {
        let topic = topic.trim();
        if topic.is_empty() {
            return Snapshot::empty(topic);
        }

        let (trends, news, pageviews, social) = futures::join!(
            self.search_interest(topic),
            self.news_headlines(topic),
            self.pageviews(topic),
            self.social_posts(topic, credentials),
        );

        let snapshot = Snapshot {
            topic: topic.to_string(),
            taken_at: Local::now(),
            trends,
            news,
            pageviews,
            social,
        };
        info!(
            topic,
            populated = snapshot.populated().len(),
            "pipeline run complete"
        );
        snapshot
    }
}

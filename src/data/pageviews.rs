//! Wikimedia pageviews client
//!
//! Resolves a topic to a canonical article title and fetches its daily
//! pageviews from the Wikimedia REST API.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::{
    ArticleViews, Credentials, SeriesPoint, SignalSource, SourceError, SourceId, TimeSeries,
};

/// Base URL for per-article pageviews
const PAGEVIEWS_BASE_URL: &str =
    "https://wikimedia.org/api/rest_v1/metrics/pageviews/per-article";

/// Default look-back window in days
const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Converts a free-text topic into a Wikipedia article title
///
/// Spaces become underscores and every alphabetic run is title-cased, so
/// `"angela merkel"` resolves to `"Angela_Merkel"`.
pub fn canonical_article_title(topic: &str) -> String {
    let mut out = String::with_capacity(topic.len());
    let mut in_word = false;

    for c in topic.trim().replace(' ', "_").chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}

#[derive(Debug, Deserialize)]
struct PageviewsResponse {
    #[serde(default)]
    items: Vec<PageviewItem>,
}

#[derive(Debug, Deserialize)]
struct PageviewItem {
    /// `YYYYMMDDHH`
    timestamp: String,
    views: u64,
}

/// Client for Wikimedia per-article pageviews
#[derive(Debug, Clone)]
pub struct PageviewsClient {
    client: Client,
    base_url: String,
    /// Wiki project, e.g. "de.wikipedia"
    project: String,
    access: String,
    agent: String,
    window_days: u32,
}

impl PageviewsClient {
    /// Creates a client for German Wikipedia over the last 30 days
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: PAGEVIEWS_BASE_URL.to_string(),
            project: "de.wikipedia".to_string(),
            access: "all-access".to_string(),
            agent: "user".to_string(),
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    /// Overrides the API base URL (mirrors and tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days.max(1);
        self
    }

    /// Fetches daily views for the article the topic resolves to
    ///
    /// Returns `Ok(None)` when the wiki has no such article (HTTP 404) or
    /// no views were recorded in the window.
    pub async fn fetch_views(&self, topic: &str) -> Result<Option<ArticleViews>, SourceError> {
        let article = canonical_article_title(topic);
        if article.is_empty() {
            return Ok(None);
        }

        // Today's numbers are not published yet
        let end = Utc::now().date_naive() - Duration::days(1);
        let start = end - Duration::days(i64::from(self.window_days) - 1);
        let url = self.article_url(&article, start, end)?;

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body: PageviewsResponse = response.json().await?;
        let series = parse_items(&body.items)?;

        if series.is_empty() {
            Ok(None)
        } else {
            Ok(Some(ArticleViews { article, series }))
        }
    }

    /// Builds `<base>/<project>/<access>/<agent>/<article>/daily/<start>/<end>`
    fn article_url(&self, article: &str, start: NaiveDate, end: NaiveDate) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SourceError::Parse(format!("invalid base url: {}", e)))?;
        let start = start.format("%Y%m%d").to_string();
        let end = end.format("%Y%m%d").to_string();

        url.path_segments_mut()
            .map_err(|_| SourceError::Parse("base url cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend([
                self.project.as_str(),
                self.access.as_str(),
                self.agent.as_str(),
                article,
                "daily",
                start.as_str(),
                end.as_str(),
            ]);

        Ok(url)
    }
}

#[async_trait]
impl SignalSource for PageviewsClient {
    type Output = ArticleViews;

    fn id(&self) -> SourceId {
        SourceId::Pageviews
    }

    fn params(&self) -> Vec<String> {
        vec![
            self.project.clone(),
            self.access.clone(),
            self.agent.clone(),
            self.window_days.to_string(),
        ]
    }

    async fn fetch(
        &self,
        topic: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Option<ArticleViews>, SourceError> {
        self.fetch_views(topic).await
    }
}

fn parse_items(items: &[PageviewItem]) -> Result<TimeSeries, SourceError> {
    let mut points = Vec::with_capacity(items.len());
    for item in items {
        let day = item.timestamp.get(..8).ok_or_else(|| {
            SourceError::Parse(format!("invalid timestamp: {}", item.timestamp))
        })?;
        let date = NaiveDate::parse_from_str(day, "%Y%m%d")
            .map_err(|_| SourceError::Parse(format!("invalid timestamp: {}", item.timestamp)))?;
        points.push(SeriesPoint {
            date,
            value: item.views,
        });
    }
    Ok(TimeSeries::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const BASE_PATH: &str = "/api/rest_v1/metrics/pageviews/per-article";

    fn client_for(server: &MockServer) -> PageviewsClient {
        PageviewsClient::new(Client::new()).with_base_url(server.url(BASE_PATH))
    }

    #[test]
    fn test_canonical_title_replaces_spaces_and_title_cases() {
        assert_eq!(canonical_article_title("angela merkel"), "Angela_Merkel");
        assert_eq!(canonical_article_title("Bitcoin"), "Bitcoin");
        assert_eq!(canonical_article_title("KI"), "Ki");
        assert_eq!(canonical_article_title("  quantum foo "), "Quantum_Foo");
    }

    #[test]
    fn test_canonical_title_restarts_after_non_letters() {
        assert_eq!(canonical_article_title("2pac"), "2Pac");
        assert_eq!(canonical_article_title("rock'n'roll"), "Rock'N'Roll");
        assert_eq!(canonical_article_title("über uns"), "Über_Uns");
    }

    #[test]
    fn test_article_url_encodes_title() {
        let client = PageviewsClient::new(Client::new());
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        let url = client.article_url("Über_Uns", start, end).unwrap();

        assert_eq!(
            url.as_str(),
            "https://wikimedia.org/api/rest_v1/metrics/pageviews/per-article/de.wikipedia/all-access/user/%C3%9Cber_Uns/daily/20240101/20240130"
        );
    }

    #[tokio::test]
    async fn test_fetch_views_parses_daily_items() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path_contains("/de.wikipedia/all-access/user/Bitcoin/daily/");
                then.status(200).json_body(json!({
                    "items": [
                        {"project": "de.wikipedia", "article": "Bitcoin", "granularity": "daily",
                         "timestamp": "2024010100", "access": "all-access", "agent": "user", "views": 1200},
                        {"project": "de.wikipedia", "article": "Bitcoin", "granularity": "daily",
                         "timestamp": "2024010200", "access": "all-access", "agent": "user", "views": 800}
                    ]
                }));
            })
            .await;

        let views = client_for(&server)
            .fetch_views("bitcoin")
            .await
            .expect("fetch should succeed")
            .expect("views should be present");

        mock.assert_async().await;
        assert_eq!(views.article, "Bitcoin");
        assert_eq!(views.series.total(), 2000);
        assert_eq!(
            views.series.points[1].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[tokio::test]
    async fn test_unknown_article_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/Quantum_Foo/");
                then.status(404).json_body(json!({"title": "Not found."}));
            })
            .await;

        let result = client_for(&server).fetch_views("quantum foo").await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_server_error_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/Bitcoin/");
                then.status(503);
            })
            .await;

        let result = client_for(&server).fetch_views("Bitcoin").await;
        assert!(matches!(result, Err(SourceError::Status(503))));
    }

    #[test]
    fn test_parse_items_rejects_short_timestamp() {
        let items = vec![PageviewItem {
            timestamp: "2024".to_string(),
            views: 1,
        }];
        assert!(parse_items(&items).is_err());
    }
}

//! Google Trends search-interest client
//!
//! Trends has no public API. This client follows the two-step flow the web UI
//! uses: an `explore` call returns a token for the TIMESERIES widget, and the
//! `widgetdata/multiline` call returns the daily interest values (0-100).

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Credentials, SeriesPoint, SignalSource, SourceError, SourceId, TimeSeries};

/// Base URL for Google Trends
const TRENDS_BASE_URL: &str = "https://trends.google.com";

/// Client for the Google Trends interest-over-time series
#[derive(Debug, Clone)]
pub struct TrendsClient {
    client: Client,
    base_url: String,
    /// UI language, e.g. "de-DE"
    hl: String,
    /// Region filter, e.g. "DE"
    geo: String,
    /// Timezone offset in minutes
    tz: i32,
    /// Look-back window, e.g. "today 1-m"
    timeframe: String,
}

impl TrendsClient {
    /// Creates a client for the German market over the last 30 days
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: TRENDS_BASE_URL.to_string(),
            hl: "de-DE".to_string(),
            geo: "DE".to_string(),
            tz: 60,
            timeframe: "today 1-m".to_string(),
        }
    }

    /// Overrides the base URL (mirrors and tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets language, region and timezone offset
    pub fn with_locale(mut self, hl: impl Into<String>, geo: impl Into<String>, tz: i32) -> Self {
        self.hl = hl.into();
        self.geo = geo.into();
        self.tz = tz;
        self
    }

    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = timeframe.into();
        self
    }

    /// Fetches the interest-over-time series for `keyword`
    ///
    /// # Returns
    /// * `Ok(Some(TimeSeries))` - one point per day that carries data
    /// * `Ok(None)` - Trends has no timeline for the keyword
    /// * `Err(SourceError)` - the request failed or the response was malformed
    pub async fn fetch_interest(&self, keyword: &str) -> Result<Option<TimeSeries>, SourceError> {
        self.warm_up().await;

        let widget = self.explore(keyword).await?;
        let Some(widget) = widget else {
            return Ok(None);
        };

        let req = serde_json::to_string(&widget.request)?;
        let tz = self.tz.to_string();
        let response = self
            .client
            .get(format!("{}/trends/api/widgetdata/multiline", self.base_url))
            .query(&[
                ("hl", self.hl.as_str()),
                ("tz", tz.as_str()),
                ("req", req.as_str()),
                ("token", widget.token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let text = response.text().await?;
        let multiline: MultilineResponse = serde_json::from_str(strip_xssi_prefix(&text)?)?;
        let series = parse_timeline(&multiline.default.timeline_data);

        if series.is_empty() {
            Ok(None)
        } else {
            Ok(Some(series))
        }
    }

    /// Requests the landing page so the cookie store picks up a session cookie
    async fn warm_up(&self) {
        let result = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("geo", self.geo.as_str())])
            .send()
            .await;
        if let Err(e) = result {
            debug!(error = %e, "trends warm-up request failed");
        }
    }

    /// Runs the explore request and returns the TIMESERIES widget, if any
    async fn explore(&self, keyword: &str) -> Result<Option<Widget>, SourceError> {
        let req = json!({
            "comparisonItem": [{
                "keyword": keyword,
                "time": self.timeframe,
                "geo": self.geo,
            }],
            "category": 0,
            "property": "",
        })
        .to_string();
        let tz = self.tz.to_string();

        let response = self
            .client
            .get(format!("{}/trends/api/explore", self.base_url))
            .query(&[
                ("hl", self.hl.as_str()),
                ("tz", tz.as_str()),
                ("req", req.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let text = response.text().await?;
        let explore: ExploreResponse = serde_json::from_str(strip_xssi_prefix(&text)?)?;

        Ok(explore.widgets.into_iter().find(|w| w.id == "TIMESERIES"))
    }
}

#[async_trait]
impl SignalSource for TrendsClient {
    type Output = TimeSeries;

    fn id(&self) -> SourceId {
        SourceId::SearchInterest
    }

    fn params(&self) -> Vec<String> {
        vec![
            self.hl.clone(),
            self.geo.clone(),
            self.tz.to_string(),
            self.timeframe.clone(),
        ]
    }

    async fn fetch(
        &self,
        topic: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Option<TimeSeries>, SourceError> {
        self.fetch_interest(topic).await
    }
}

/// Strips the anti-JSON-hijacking prefix (`)]}'` and friends) Google puts
/// in front of its JSON bodies
fn strip_xssi_prefix(body: &str) -> Result<&str, SourceError> {
    body.find('{')
        .map(|start| &body[start..])
        .ok_or_else(|| SourceError::Parse("response contains no JSON object".to_string()))
}

/// Converts timeline entries to daily points, skipping entries without data
fn parse_timeline(entries: &[TimelineEntry]) -> TimeSeries {
    let points = entries
        .iter()
        .filter(|e| e.has_data.first().copied().unwrap_or(true))
        .filter_map(|e| {
            let secs: i64 = e.time.parse().ok()?;
            let date = DateTime::from_timestamp(secs, 0)?.date_naive();
            let value = e.value.first().copied()?;
            Some(SeriesPoint { date, value })
        })
        .collect();
    TimeSeries::new(points)
}

/// Explore endpoint response
#[derive(Debug, Deserialize)]
struct ExploreResponse {
    #[serde(default)]
    widgets: Vec<Widget>,
}

/// A widget descriptor from the explore response
#[derive(Debug, Deserialize)]
struct Widget {
    id: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    request: Value,
}

/// Multiline widget data response
#[derive(Debug, Deserialize)]
struct MultilineResponse {
    default: MultilineDefault,
}

#[derive(Debug, Deserialize)]
struct MultilineDefault {
    #[serde(rename = "timelineData", default)]
    timeline_data: Vec<TimelineEntry>,
}

/// One timeline sample; `time` is a unix timestamp string
#[derive(Debug, Deserialize)]
struct TimelineEntry {
    time: String,
    #[serde(default)]
    value: Vec<u64>,
    #[serde(rename = "hasData", default)]
    has_data: Vec<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use httpmock::prelude::*;

    const EXPLORE_BODY: &str = r#")]}'
{"widgets":[
  {"id":"GEO_MAP","token":"geo-token","request":{}},
  {"id":"TIMESERIES","token":"ts-token","request":{"time":"2024-01-01 2024-01-03","resolution":"DAY"}}
]}"#;

    const MULTILINE_BODY: &str = r#")]}',
{"default":{"timelineData":[
  {"time":"1704067200","formattedTime":"Jan 1, 2024","value":[40],"hasData":[true]},
  {"time":"1704153600","formattedTime":"Jan 2, 2024","value":[55],"hasData":[true]},
  {"time":"1704240000","formattedTime":"Jan 3, 2024","value":[60],"hasData":[true]},
  {"time":"1704326400","formattedTime":"Jan 4, 2024","value":[0],"hasData":[false]}
],"averages":[]}}"#;

    fn client_for(server: &MockServer) -> TrendsClient {
        TrendsClient::new(Client::new()).with_base_url(server.base_url())
    }

    #[test]
    fn test_strip_xssi_prefix() {
        assert_eq!(strip_xssi_prefix(")]}'\n{\"a\":1}").unwrap(), "{\"a\":1}");
        assert_eq!(strip_xssi_prefix("{}").unwrap(), "{}");
        assert!(strip_xssi_prefix(")]}'").is_err());
    }

    #[test]
    fn test_parse_timeline_skips_entries_without_data() {
        let multiline: MultilineResponse =
            serde_json::from_str(strip_xssi_prefix(MULTILINE_BODY).unwrap()).unwrap();
        let series = parse_timeline(&multiline.default.timeline_data);

        assert_eq!(series.len(), 3);
        assert_eq!(
            series.points[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(series.values(), vec![40, 55, 60]);
    }

    #[tokio::test]
    async fn test_fetch_interest_follows_widget_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body("ok");
            })
            .await;
        let explore = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/trends/api/explore")
                    .query_param("hl", "de-DE")
                    .query_param("tz", "60");
                then.status(200).body(EXPLORE_BODY);
            })
            .await;
        let multiline = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/trends/api/widgetdata/multiline")
                    .query_param("token", "ts-token");
                then.status(200).body(MULTILINE_BODY);
            })
            .await;

        let series = client_for(&server)
            .fetch_interest("Bitcoin")
            .await
            .expect("fetch should succeed")
            .expect("series should be present");

        explore.assert_async().await;
        multiline.assert_async().await;
        assert_eq!(series.values(), vec![40, 55, 60]);
    }

    #[tokio::test]
    async fn test_missing_timeseries_widget_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/trends/api/explore");
                then.status(200).body(r#")]}'{"widgets":[]}"#);
            })
            .await;

        let result = client_for(&server).fetch_interest("nothing").await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_rate_limit_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/trends/api/explore");
                then.status(429);
            })
            .await;

        let result = client_for(&server).fetch_interest("Bitcoin").await;
        assert!(matches!(result, Err(SourceError::Status(429))));
    }

    #[test]
    fn test_params_include_locale_and_window() {
        let client = TrendsClient::new(Client::new()).with_locale("en-US", "US", -300);
        let params = client.params();
        assert!(params.contains(&"en-US".to_string()));
        assert!(params.contains(&"US".to_string()));
        assert!(params.contains(&"today 1-m".to_string()));
    }
}

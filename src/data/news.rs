//! Google News RSS headline client
//!
//! Fetches the search feed for a topic and maps the newest items to
//! [`Headline`]s in the order the feed lists them.

use async_trait::async_trait;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;

use super::{Credentials, Headline, SignalSource, SourceError, SourceId};

/// Base URL for the Google News search feed
const NEWS_BASE_URL: &str = "https://news.google.com/rss/search";

/// Default number of headlines kept from the feed
const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Client for the Google News RSS search feed
#[derive(Debug, Clone)]
pub struct NewsClient {
    client: Client,
    base_url: String,
    hl: String,
    gl: String,
    ceid: String,
    limit: usize,
}

impl NewsClient {
    /// Creates a client for German-language news
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: NEWS_BASE_URL.to_string(),
            hl: "de".to_string(),
            gl: "DE".to_string(),
            ceid: "DE:de".to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Overrides the feed URL (mirrors and tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets feed language, country and edition id
    pub fn with_locale(
        mut self,
        hl: impl Into<String>,
        gl: impl Into<String>,
        ceid: impl Into<String>,
    ) -> Self {
        self.hl = hl.into();
        self.gl = gl.into();
        self.ceid = ceid.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Fetches the newest headlines for `keyword`
    ///
    /// Returns `Ok(None)` when the feed has no items.
    pub async fn fetch_headlines(&self, keyword: &str) -> Result<Option<Vec<Headline>>, SourceError> {
        let query = keyword.replace('#', "");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query.trim()),
                ("hl", self.hl.as_str()),
                ("gl", self.gl.as_str()),
                ("ceid", self.ceid.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let headlines = parse_feed(&body, self.limit)?;

        if headlines.is_empty() {
            Ok(None)
        } else {
            Ok(Some(headlines))
        }
    }
}

#[async_trait]
impl SignalSource for NewsClient {
    type Output = Vec<Headline>;

    fn id(&self) -> SourceId {
        SourceId::News
    }

    fn params(&self) -> Vec<String> {
        vec![
            self.hl.clone(),
            self.gl.clone(),
            self.ceid.clone(),
            self.limit.to_string(),
        ]
    }

    async fn fetch(
        &self,
        topic: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Option<Vec<Headline>>, SourceError> {
        self.fetch_headlines(topic).await
    }
}

/// Parses an RSS document and keeps the first `limit` items with a title
fn parse_feed(xml: &str, limit: usize) -> Result<Vec<Headline>, SourceError> {
    let rss: Rss = from_str(xml).map_err(|e| SourceError::Parse(format!("rss: {}", e)))?;

    let headlines = rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| {
            let title = clean_text(item.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                return None;
            }
            Some(Headline {
                title,
                link: item.link.map(|l| l.trim().to_string()).unwrap_or_default(),
                published_at: item.pub_date.map(|d| d.trim().to_string()),
            })
        })
        .take(limit)
        .collect();

    Ok(headlines)
}

/// Decodes HTML entities and collapses whitespace
fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Bluesky post search client
//!
//! Logs in with an app password (`com.atproto.server.createSession`) and runs
//! `app.bsky.feed.searchPosts` for the topic. Also provides the term
//! frequency used for the social column's word ranking.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Credentials, Post, SignalSource, SourceError, SourceId};

/// Base URL of the Bluesky PDS entryway
const BLUESKY_BASE_URL: &str = "https://bsky.social";

/// Default number of posts requested per search
const DEFAULT_LIMIT: usize = 20;

/// Minimum word length counted by [`top_terms`]
const MIN_TERM_CHARS: usize = 4;

/// Frequent German and English words that carry no signal
const STOPWORDS: &[&str] = &[
    "aber", "about", "alle", "also", "auch", "been", "dann", "dass", "dein", "diese", "doch",
    "eine", "einem", "einen", "einer", "from", "gibt", "have", "haben", "hier", "ich", "immer",
    "just", "kann", "mehr", "mein", "mich", "mit", "nach", "nicht", "noch", "oder", "over",
    "schon", "sein", "sind", "some", "that", "their", "them", "then", "there", "they", "this",
    "und", "very", "waren", "warum", "were", "what", "when", "wenn", "werden", "will", "with",
    "wird", "your", "zum", "zur", "über",
];

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct Session {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    posts: Vec<PostView>,
}

#[derive(Debug, Deserialize)]
struct PostView {
    author: Author,
    #[serde(default)]
    record: Record,
}

#[derive(Debug, Deserialize)]
struct Author {
    handle: String,
}

#[derive(Debug, Default, Deserialize)]
struct Record {
    #[serde(default)]
    text: String,
}

/// Client for Bluesky post search
#[derive(Debug, Clone)]
pub struct BlueskyClient {
    client: Client,
    base_url: String,
    limit: usize,
}

impl BlueskyClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: BLUESKY_BASE_URL.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Overrides the PDS URL (self-hosted servers and tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Searches posts mentioning `query`
    ///
    /// Without credentials this returns `Ok(None)` before any request is made.
    pub async fn search_posts(
        &self,
        query: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Option<Vec<Post>>, SourceError> {
        let Some(credentials) = credentials else {
            debug!("no bluesky credentials, skipping search");
            return Ok(None);
        };

        let token = self.login(credentials).await?;
        let limit = self.limit.to_string();

        let response = self
            .client
            .get(format!("{}/xrpc/app.bsky.feed.searchPosts", self.base_url))
            .bearer_auth(token)
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let body: SearchResponse = response.json().await?;
        let posts: Vec<Post> = body
            .posts
            .into_iter()
            .take(self.limit)
            .map(|p| Post {
                author: p.author.handle,
                text: p.record.text,
            })
            .collect();

        if posts.is_empty() {
            Ok(None)
        } else {
            Ok(Some(posts))
        }
    }

    /// Creates a session and returns its access token
    async fn login(&self, credentials: &Credentials) -> Result<String, SourceError> {
        let response = self
            .client
            .post(format!(
                "{}/xrpc/com.atproto.server.createSession",
                self.base_url
            ))
            .json(&CreateSessionRequest {
                identifier: &credentials.principal,
                password: &credentials.secret,
            })
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let session: Session = response.json().await?;
                Ok(session.access_jwt)
            }
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => Err(SourceError::Auth(format!(
                "login for {} was rejected",
                credentials.principal
            ))),
            s => Err(SourceError::Status(s.as_u16())),
        }
    }
}

#[async_trait]
impl SignalSource for BlueskyClient {
    type Output = Vec<Post>;

    fn id(&self) -> SourceId {
        SourceId::Social
    }

    fn params(&self) -> Vec<String> {
        vec![self.limit.to_string()]
    }

    async fn fetch(
        &self,
        topic: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Option<Vec<Post>>, SourceError> {
        self.search_posts(topic, credentials).await
    }
}

/// Ranks the most frequent words across posts
///
/// Words are lower-cased alphabetic runs of at least four letters. Links,
/// mentions and common stopwords are ignored. Ties are ordered alphabetically.
pub fn top_terms(posts: &[Post], n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for post in posts {
        for token in post.text.split_whitespace() {
            if token.starts_with("http") || token.starts_with('@') || token.starts_with("www.") {
                continue;
            }
            for word in token.split(|c: char| !c.is_alphabetic()) {
                if word.chars().count() < MIN_TERM_CHARS {
                    continue;
                }
                let word = word.to_lowercase();
                if STOPWORDS.contains(&word.as_str()) {
                    continue;
                }
                *counts.entry(word).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

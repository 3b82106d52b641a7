//! LLM-written topic summary
//!
//! Builds a fixed prompt from a [`Snapshot`] and sends it to an
//! OpenAI-compatible chat completions endpoint. Callers always get text back:
//! when the model cannot be reached the text is a visible sentinel message.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::FetchResult;
use crate::config::Settings;
use crate::pipeline::Snapshot;

/// Default OpenAI API root
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Prefix of every message shown instead of a summary
pub const UNAVAILABLE_PREFIX: &str = "Summary unavailable";

/// Headlines and posts included in the prompt
const PROMPT_ITEMS: usize = 10;

const SYSTEM_PROMPT: &str = "You are a media analyst. Answer in plain prose with short \
paragraphs, no tables.";

/// Errors from the text generation backend
#[derive(Debug, Error)]
pub enum SummaryError {
    /// No API key is configured
    #[error("no API key configured")]
    MissingKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {0}")]
    Status(u16),

    /// The model answered without any text
    #[error("empty response")]
    EmptyResponse,
}

/// Something that turns a prompt into prose
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Builds a generator from settings with its own request timeout
    pub fn from_settings(settings: &Settings) -> Result<Self, SummaryError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(settings.request_timeout() * 4)
            .build()?;
        let mut generator =
            Self::new(client, settings.openai_api_key()).with_model(&settings.openai_model);
        if let Some(base_url) = &settings.openai_base_url {
            generator = generator.with_base_url(base_url);
        }
        Ok(generator)
    }

    /// Overrides the API root (compatible servers and tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
        let api_key = self.api_key.as_deref().ok_or(SummaryError::MissingKey)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SummaryError::Status(response.status().as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(SummaryError::EmptyResponse)
    }
}

/// Describes the direction of a series from its first to its last value
fn trend_direction(first: u64, last: u64) -> &'static str {
    match last.cmp(&first) {
        std::cmp::Ordering::Greater => "rising",
        std::cmp::Ordering::Less => "falling",
        std::cmp::Ordering::Equal => "flat",
    }
}

/// Fills the fixed analysis template with whatever the snapshot holds
pub fn build_prompt(snapshot: &Snapshot) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Topic: {}", snapshot.topic);
    prompt.push('\n');

    prompt.push_str("Search interest (0-100, last 30 days): ");
    match &snapshot.trends {
        FetchResult::Data(series) => match (series.points.first(), series.latest()) {
            (Some(first), Some(last)) => {
                let _ = writeln!(
                    prompt,
                    "current score {}, {} since {}",
                    last.value,
                    trend_direction(first.value, last.value),
                    first.date
                );
            }
            _ => prompt.push_str("no data\n"),
        },
        _ => prompt.push_str("no data\n"),
    }

    prompt.push_str("News headlines:");
    match &snapshot.news {
        FetchResult::Data(headlines) => {
            prompt.push('\n');
            for headline in headlines.iter().take(PROMPT_ITEMS) {
                let _ = writeln!(prompt, "- {}", headline.title);
            }
        }
        _ => prompt.push_str(" no data\n"),
    }

    prompt.push_str("Wikipedia pageviews: ");
    match &snapshot.pageviews {
        FetchResult::Data(views) => {
            let _ = writeln!(
                prompt,
                "{} total views of \"{}\"",
                views.series.total(),
                views.article
            );
        }
        _ => prompt.push_str("no data\n"),
    }

    prompt.push_str("Social posts:");
    match &snapshot.social {
        FetchResult::Data(posts) => {
            prompt.push('\n');
            for post in posts.iter().take(PROMPT_ITEMS) {
                let text = post.text.split_whitespace().collect::<Vec<_>>().join(" ");
                let _ = writeln!(prompt, "- {}", text);
            }
        }
        _ => prompt.push_str(" no data\n"),
    }

    prompt.push_str(
        "\nWrite an analysis with exactly four sections:\n\
         1. Overall situation\n\
         2. Sentiment\n\
         3. Risk\n\
         4. Recommendation\n",
    );
    prompt
}

/// Returns the generated summary, or a sentinel message explaining why not
pub async fn summarize(generator: &dyn TextGenerator, snapshot: &Snapshot) -> String {
    let prompt = build_prompt(snapshot);
    match generator.generate(&prompt).await {
        Ok(text) => {
            info!(topic = %snapshot.topic, chars = text.len(), "summary generated");
            text
        }
        Err(e) => {
            warn!(topic = %snapshot.topic, error = %e, "summary failed");
            format!("{}: {}", UNAVAILABLE_PREFIX, e)
        }
    }
}

/// True if `text` is a sentinel rather than a real summary
pub fn is_unavailable(text: &str) -> bool {
    text.starts_with(UNAVAILABLE_PREFIX)
}

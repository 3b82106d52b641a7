//! Command-line interface parsing for Trend Radar
//!
//! Parses the topic and run-mode flags with clap and turns them into a
//! validated [`StartupConfig`].

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

/// Topic shown when none is given
pub const DEFAULT_TOPIC: &str = "Bitcoin";

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The topic is empty or only whitespace
    #[error("Invalid topic: the topic must not be blank")]
    BlankTopic,
}

/// Trend Radar - public attention for a keyword across search, news, Wikipedia and Bluesky
#[derive(Parser, Debug)]
#[command(name = "trendradar")]
#[command(about = "Keyword attention dashboard: search interest, news, Wikipedia and Bluesky")]
#[command(version)]
pub struct Cli {
    /// Topic to track
    #[arg(default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Settings file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print a plain-text digest instead of opening the dashboard
    #[arg(long)]
    pub headless: bool,

    /// Write CSV and PDF exports to DIR (headless mode)
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Generate an LLM summary (headless mode)
    #[arg(long)]
    pub summary: bool,

    /// Auto-refresh interval in seconds, 0 disables
    #[arg(long, value_name = "SECS")]
    pub refresh: Option<u64>,
}

/// Validated startup options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupConfig {
    pub topic: String,
    pub config_path: Option<PathBuf>,
    pub headless: bool,
    pub export_dir: Option<PathBuf>,
    pub summarize: bool,
    /// Overrides the configured refresh interval when set
    pub refresh_secs: Option<u64>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            config_path: None,
            headless: false,
            export_dir: None,
            summarize: false,
            refresh_secs: None,
        }
    }
}

/// Trims a topic and rejects blank ones
pub fn parse_topic_arg(s: &str) -> Result<String, CliError> {
    let topic = s.trim();
    if topic.is_empty() {
        Err(CliError::BlankTopic)
    } else {
        Ok(topic.to_string())
    }
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with the trimmed topic
    /// * `Err(CliError)` if the topic is blank
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        Ok(StartupConfig {
            topic: parse_topic_arg(&cli.topic)?,
            config_path: cli.config.clone(),
            headless: cli.headless,
            export_dir: cli.export.clone(),
            summarize: cli.summary,
            refresh_secs: cli.refresh,
        })
    }
}

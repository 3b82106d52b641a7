//! Application state management for Trend Radar
//!
//! This module contains the dashboard state, keyboard handling, and the
//! actions a key can trigger: reloading the pipeline, summarizing and
//! exporting the current snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::info;

use crate::cli::StartupConfig;
use crate::data::{top_terms, Credentials, Post};
use crate::export;
use crate::pipeline::{Pipeline, Snapshot};
use crate::summary::{self, TextGenerator};

/// Posts previewed in the social column
pub const POST_PREVIEWS: usize = 3;

/// Characters shown of each previewed post
pub const PREVIEW_CHARS: usize = 100;

/// Terms listed in the social column
pub const TOP_TERMS: usize = 8;

/// Whether keys edit the topic or trigger actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Per-topic values that survive reloads, such as generated summaries
#[derive(Debug, Default)]
pub struct Session {
    summaries: HashMap<String, String>,
}

impl Session {
    pub fn summary(&self, topic: &str) -> Option<&str> {
        self.summaries.get(topic).map(String::as_str)
    }

    pub fn store_summary(&mut self, topic: impl Into<String>, text: impl Into<String>) {
        self.summaries.insert(topic.into(), text.into());
    }
}

/// Shortens `text` to `max` characters, marking the cut with an ellipsis
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Main application struct managing state and data
pub struct App {
    /// Topic the dashboard currently shows
    pub topic: String,
    /// Edit buffer for the topic prompt
    pub input: String,
    pub input_mode: InputMode,
    /// Latest pipeline result, `None` until the first load
    pub snapshot: Option<Snapshot>,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Timestamp of last data refresh
    pub last_refresh: Option<DateTime<Local>>,
    /// One-line feedback shown in the status bar
    pub status: Option<String>,
    /// Flag indicating a reload has been requested
    pub refresh_requested: bool,
    pub summary_requested: bool,
    pub export_requested: bool,
    pub session: Session,
    pipeline: Arc<Pipeline>,
    generator: Arc<dyn TextGenerator>,
    credentials: Option<Credentials>,
    export_dir: PathBuf,
}

impl App {
    pub fn new(
        pipeline: Arc<Pipeline>,
        generator: Arc<dyn TextGenerator>,
        credentials: Option<Credentials>,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            topic: crate::cli::DEFAULT_TOPIC.to_string(),
            input: String::new(),
            input_mode: InputMode::Normal,
            snapshot: None,
            should_quit: false,
            show_help: false,
            last_refresh: None,
            status: None,
            refresh_requested: false,
            summary_requested: false,
            export_requested: false,
            session: Session::default(),
            pipeline,
            generator,
            credentials,
            export_dir,
        }
    }

    /// Applies CLI startup options
    pub fn with_startup_config(mut self, config: &StartupConfig) -> Self {
        self.topic = config.topic.clone();
        if let Some(dir) = &config.export_dir {
            self.export_dir = dir.clone();
        }
        self
    }

    /// True while the first load for the current topic is outstanding
    pub fn is_loading(&self) -> bool {
        self.snapshot
            .as_ref()
            .map_or(true, |snapshot| snapshot.topic != self.topic)
    }

    pub fn has_social_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Summary generated earlier for the current topic
    pub fn current_summary(&self) -> Option<&str> {
        self.session.summary(&self.topic)
    }

    /// Runs the pipeline for the current topic
    pub async fn load(&mut self) {
        let snapshot = self
            .pipeline
            .run(&self.topic, self.credentials.as_ref())
            .await;
        self.last_refresh = Some(snapshot.taken_at);
        self.snapshot = Some(snapshot);
        self.refresh_requested = false;
    }

    /// Summarizes the current snapshot and stores the text in the session
    pub async fn summarize(&mut self) {
        self.summary_requested = false;
        let Some(snapshot) = &self.snapshot else {
            self.status = Some("Nothing to summarize yet".to_string());
            return;
        };

        let text = summary::summarize(self.generator.as_ref(), snapshot).await;
        self.status = Some(if summary::is_unavailable(&text) {
            text.clone()
        } else {
            "Summary ready".to_string()
        });
        self.session.store_summary(snapshot.topic.clone(), text);
    }

    /// Writes CSVs and the PDF report for the current snapshot
    pub fn export(&mut self) {
        self.export_requested = false;
        let Some(snapshot) = &self.snapshot else {
            self.status = Some("Nothing to export yet".to_string());
            return;
        };

        let summary = self.session.summary(&snapshot.topic);
        self.status = Some(match export::export_all(&self.export_dir, snapshot, summary) {
            Ok(outcome) if outcome.is_complete() => format!(
                "Exported {} files to {}",
                outcome.written.len(),
                self.export_dir.display()
            ),
            Ok(outcome) => format!(
                "Exported {} files, {} failed: {}",
                outcome.written.len(),
                outcome.errors.len(),
                outcome.errors.join("; ")
            ),
            Err(e) => format!("Export failed: {}", e),
        });
    }

    /// Posts shown in the social column
    pub fn post_previews(&self) -> Vec<(String, String)> {
        self.posts()
            .iter()
            .take(POST_PREVIEWS)
            .map(|post| (post.author.clone(), preview(&post.text, PREVIEW_CHARS)))
            .collect()
    }

    /// Most frequent terms across the fetched posts
    pub fn social_terms(&self) -> Vec<(String, usize)> {
        top_terms(self.posts(), TOP_TERMS)
    }

    fn posts(&self) -> &[Post] {
        self.snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.social.data())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Handles keyboard input based on current mode
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        if key_event.modifiers.contains(KeyModifiers::CONTROL)
            && key_event.code == KeyCode::Char('c')
        {
            self.should_quit = true;
            return;
        }

        // Help overlay swallows keys until closed
        if self.show_help {
            if matches!(key_event.code, KeyCode::Esc | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return;
        }

        match self.input_mode {
            InputMode::Editing => match key_event.code {
                KeyCode::Enter => self.submit_topic(),
                KeyCode::Esc => {
                    self.input.clear();
                    self.input_mode = InputMode::Normal;
                }
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Char(c) => self.input.push(c),
                _ => {}
            },
            InputMode::Normal => match key_event.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Char('/') => {
                    self.input = self.topic.clone();
                    self.input_mode = InputMode::Editing;
                }
                KeyCode::Char('r') => {
                    self.refresh_requested = true;
                }
                KeyCode::Char('s') => {
                    self.summary_requested = true;
                    self.status = Some("Generating summary...".to_string());
                }
                KeyCode::Char('e') => {
                    self.export_requested = true;
                }
                KeyCode::Char('?') => {
                    self.show_help = true;
                }
                _ => {}
            },
        }
    }

    fn submit_topic(&mut self) {
        let topic = self.input.trim().to_string();
        self.input_mode = InputMode::Normal;
        self.input.clear();

        if topic.is_empty() {
            self.status = Some("Topic must not be blank".to_string());
            return;
        }
        if topic != self.topic {
            info!(from = %self.topic, to = %topic, "topic changed");
            self.topic = topic;
        }
        self.status = None;
        self.refresh_requested = true;
    }
}

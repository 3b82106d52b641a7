//! Composite report model
//!
//! A [`Report`] is the printable view of a snapshot: a header plus the
//! sections whose sources returned data, always in the same order.

use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::cache::FetchResult;
use crate::data::{ArticleViews, Headline, TimeSeries};
use crate::pipeline::Snapshot;
use crate::summary;

/// Most headlines shown in a report
pub const HEADLINE_CAP: usize = 5;

/// One block of the report
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// Search-interest line chart with the latest score
    SearchInterest { series: TimeSeries, current: u64 },
    /// Total pageviews of the resolved article
    Pageviews { article: String, total: u64 },
    Headlines(Vec<Headline>),
    Summary(String),
}

impl Section {
    pub fn heading(&self) -> &'static str {
        match self {
            Section::SearchInterest { .. } => "Search interest",
            Section::Pageviews { .. } => "Wikipedia pageviews",
            Section::Headlines(_) => "Latest headlines",
            Section::Summary(_) => "Analysis",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub topic: String,
    pub generated_at: DateTime<Local>,
    pub sections: Vec<Section>,
}

/// Collects source results and assembles a [`Report`]
#[derive(Debug, Default)]
pub struct ReportBuilder {
    topic: String,
    trends: Option<Arc<TimeSeries>>,
    pageviews: Option<Arc<ArticleViews>>,
    headlines: Option<Arc<Vec<Headline>>>,
    summary: Option<String>,
}

fn data_of<T>(result: &FetchResult<T>) -> Option<Arc<T>> {
    match result {
        FetchResult::Data(data) => Some(Arc::clone(data)),
        _ => None,
    }
}

impl ReportBuilder {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Builder over every source of a snapshot plus an optional summary
    pub fn from_snapshot(snapshot: &Snapshot, summary: Option<&str>) -> Self {
        let builder = Self::new(snapshot.topic.clone())
            .search_interest(&snapshot.trends)
            .pageviews(&snapshot.pageviews)
            .headlines(&snapshot.news);
        match summary {
            Some(text) => builder.summary(text),
            None => builder,
        }
    }

    pub fn search_interest(mut self, result: &FetchResult<TimeSeries>) -> Self {
        self.trends = data_of(result);
        self
    }

    pub fn pageviews(mut self, result: &FetchResult<ArticleViews>) -> Self {
        self.pageviews = data_of(result);
        self
    }

    pub fn headlines(mut self, result: &FetchResult<Vec<Headline>>) -> Self {
        self.headlines = data_of(result);
        self
    }

    /// Sentinel messages from a failed summary are not included
    pub fn summary(mut self, text: &str) -> Self {
        let text = text.trim();
        if !text.is_empty() && !summary::is_unavailable(text) {
            self.summary = Some(text.to_string());
        }
        self
    }

    pub fn build(self) -> Report {
        let mut sections = Vec::new();

        if let Some(series) = self.trends.filter(|s| !s.is_empty()) {
            let current = series.latest().map(|p| p.value).unwrap_or(0);
            sections.push(Section::SearchInterest {
                series: (*series).clone(),
                current,
            });
        }

        if let Some(views) = self.pageviews {
            sections.push(Section::Pageviews {
                article: to_latin1_lossy(&views.article),
                total: views.series.total(),
            });
        }

        if let Some(headlines) = self.headlines.filter(|h| !h.is_empty()) {
            let capped = headlines
                .iter()
                .take(HEADLINE_CAP)
                .map(|h| Headline {
                    title: to_latin1_lossy(&h.title),
                    link: h.link.clone(),
                    published_at: h.published_at.clone(),
                })
                .collect();
            sections.push(Section::Headlines(capped));
        }

        if let Some(text) = self.summary {
            sections.push(Section::Summary(to_latin1_lossy(&clean_markup(&text))));
        }

        Report {
            title: format!("Trend Radar: {}", to_latin1_lossy(&self.topic)),
            topic: self.topic,
            generated_at: Local::now(),
            sections,
        }
    }
}

/// Strips Markdown emphasis (`**`, `__`) and leading heading markers
pub fn clean_markup(text: &str) -> String {
    text.lines()
        .map(|line| {
            let line = line.replace("**", "").replace("__", "");
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                trimmed.trim_start_matches('#').trim_start().to_string()
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replaces characters the builtin PDF fonts cannot encode with `?`
pub fn to_latin1_lossy(text: &str) -> String {
    text.chars()
        .map(|c| if u32::from(c) <= 0xFF { c } else { '?' })
        .collect()
}

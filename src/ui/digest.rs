//! Plain-text digest for headless runs

use std::fmt::Write as _;

use super::dashboard::{source_message, LOGIN_REQUIRED};
use crate::app::{preview, POST_PREVIEWS, PREVIEW_CHARS, TOP_TERMS};
use crate::cache::FetchResult;
use crate::data::top_terms;
use crate::pipeline::Snapshot;

/// Renders a snapshot (and optional summary) as plain text
pub fn digest(snapshot: &Snapshot, has_social_credentials: bool, summary: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Trend Radar: {} ({})",
        snapshot.topic,
        snapshot.taken_at.format("%Y-%m-%d %H:%M")
    );

    out.push_str("\n[Search interest]\n");
    match &snapshot.trends {
        FetchResult::Data(series) => {
            let current = series.latest().map(|p| p.value).unwrap_or(0);
            let _ = writeln!(out, "Current score: {}/100 (peak {})", current, series.max());
        }
        other => push_message(&mut out, other),
    }

    out.push_str("\n[News]\n");
    match &snapshot.news {
        FetchResult::Data(headlines) => {
            for headline in headlines.iter() {
                let _ = writeln!(out, "- {}", headline.title);
            }
        }
        other => push_message(&mut out, other),
    }

    out.push_str("\n[Wikipedia]\n");
    match &snapshot.pageviews {
        FetchResult::Data(views) => {
            let _ = writeln!(
                out,
                "{} views of {}",
                views.series.total(),
                views.article
            );
        }
        other => push_message(&mut out, other),
    }

    out.push_str("\n[Bluesky]\n");
    match &snapshot.social {
        _ if !has_social_credentials => {
            let _ = writeln!(out, "{}", LOGIN_REQUIRED);
        }
        FetchResult::Data(posts) => {
            let terms: Vec<String> = top_terms(posts, TOP_TERMS)
                .into_iter()
                .map(|(term, count)| format!("{} ({})", term, count))
                .collect();
            let _ = writeln!(out, "Top terms: {}", terms.join(", "));
            for post in posts.iter().take(POST_PREVIEWS) {
                let _ = writeln!(out, "@{}: {}", post.author, preview(&post.text, PREVIEW_CHARS));
            }
        }
        other => push_message(&mut out, other),
    }

    if let Some(summary) = summary {
        out.push_str("\n[Analysis]\n");
        out.push_str(summary.trim());
        out.push('\n');
    }

    out
}

fn push_message<T>(out: &mut String, result: &FetchResult<T>) {
    if let Some(message) = source_message(result) {
        out.push_str(&message);
        out.push('\n');
    }
}

//! Dashboard screen rendering
//!
//! Header with the topic, the search-interest sparkline, three source
//! columns (news, Wikipedia, Bluesky), the summary panel and a status line.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::widgets::TrendSparkline;
use crate::app::{App, InputMode};
use crate::cache::FetchResult;
use crate::pipeline::Snapshot;

/// Shown in the Bluesky column when no credentials are configured
pub const LOGIN_REQUIRED: &str =
    "Login required: set BLUESKY_HANDLE and BLUESKY_APP_PASSWORD to see posts";

/// Explains a result without data, or `None` when there is data
pub fn source_message<T>(result: &FetchResult<T>) -> Option<String> {
    match result {
        FetchResult::Data(_) => None,
        FetchResult::Empty => Some("No data found".to_string()),
        FetchResult::Failed(reason) => Some(format!("Source unavailable: {}", reason)),
    }
}

fn message_line(text: String, failed: bool) -> Line<'static> {
    let color = if failed { Color::Red } else { Color::DarkGray };
    Line::from(Span::styled(text, Style::default().fg(color)))
}

fn status_lines<T>(result: &FetchResult<T>) -> Vec<Line<'static>> {
    source_message(result)
        .map(|text| vec![message_line(text, result.is_failed())])
        .unwrap_or_default()
}

/// Formats a count with `.` thousands separators
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
}

/// Renders the whole dashboard
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(5), // Search interest
            Constraint::Min(8),    // Columns
            Constraint::Length(8), // Summary
            Constraint::Length(1), // Status line
        ])
        .split(area);

    render_header(frame, app, chunks[0]);

    match app.snapshot.as_ref() {
        Some(snapshot) if !app.is_loading() => {
            render_trends(frame, snapshot, chunks[1]);
            render_columns(frame, app, snapshot, chunks[2]);
        }
        _ => {
            let loading = Paragraph::new(format!("Loading data for {}...", app.topic))
                .style(Style::default().fg(Color::Cyan))
                .block(panel("Search interest"));
            frame.render_widget(loading, chunks[1]);
        }
    }

    render_summary(frame, app, chunks[3]);
    render_status(frame, app, chunks[4]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.input_mode {
        InputMode::Editing => Line::from(vec![
            Span::styled("Topic: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.input.clone()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
        ]),
        InputMode::Normal => {
            let refreshed = app
                .last_refresh
                .map(|t| format!("updated {}", t.format("%H:%M:%S")))
                .unwrap_or_else(|| "not loaded".to_string());
            Line::from(vec![
                Span::styled(
                    "Trend Radar ",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    app.topic.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  ({})", refreshed),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        }
    };

    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_trends(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let block = panel("Search interest (Google Trends)");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let series = match &snapshot.trends {
        FetchResult::Data(series) => series,
        other => {
            frame.render_widget(Paragraph::new(status_lines(other)), inner);
            return;
        }
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let current = series.latest().map(|p| p.value).unwrap_or(0);
    let range = match (series.points.first(), series.latest()) {
        (Some(first), Some(last)) => format!("  {} to {}", first.date, last.date),
        _ => String::new(),
    };
    let score = Line::from(vec![
        Span::raw("Current score: "),
        Span::styled(
            format!("{}/100", current),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(range, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(score), rows[0]);

    let values = series.values();
    frame.render_widget(TrendSparkline::new(&values, 100), rows[1]);
}

fn render_columns(frame: &mut Frame, app: &App, snapshot: &Snapshot, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(25),
            Constraint::Percentage(35),
        ])
        .split(area);

    render_news(frame, snapshot, columns[0]);
    render_wikipedia(frame, snapshot, columns[1]);
    render_social(frame, app, snapshot, columns[2]);
}

fn render_news(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let lines = match &snapshot.news {
        FetchResult::Data(headlines) => headlines
            .iter()
            .map(|h| {
                Line::from(vec![
                    Span::styled("• ", Style::default().fg(Color::Cyan)),
                    Span::raw(h.title.clone()),
                ])
            })
            .collect(),
        other => status_lines(other),
    };

    frame.render_widget(
        Paragraph::new(lines)
            .block(panel("News"))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_wikipedia(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let block = panel("Wikipedia");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let views = match &snapshot.pageviews {
        FetchResult::Data(views) => views,
        other => {
            frame.render_widget(
                Paragraph::new(status_lines(other)).wrap(Wrap { trim: true }),
                inner,
            );
            return;
        }
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let total = vec![
        Line::from(Span::styled(
            "Views (window)",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            thousands(views.series.total()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
    ];
    frame.render_widget(Paragraph::new(total), rows[0]);

    let values = views.series.values();
    frame.render_widget(
        TrendSparkline::new(&values, views.series.max()).style(Style::default().fg(Color::White)),
        rows[1],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("Article: {}", views.article),
            Style::default().fg(Color::DarkGray),
        ))
        .wrap(Wrap { trim: true }),
        rows[2],
    );
}

fn render_social(frame: &mut Frame, app: &App, snapshot: &Snapshot, area: Rect) {
    let lines: Vec<Line> = if !app.has_social_credentials() {
        vec![message_line(LOGIN_REQUIRED.to_string(), false)]
    } else if let Some(message) = source_message(&snapshot.social) {
        vec![message_line(message, snapshot.social.is_failed())]
    } else {
        let mut lines = Vec::new();
        let terms = app
            .social_terms()
            .into_iter()
            .map(|(term, count)| format!("{} ({})", term, count))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(Line::from(Span::styled(
            terms,
            Style::default().fg(Color::Magenta),
        )));
        for (author, text) in app.post_previews() {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled(
                    format!("@{}: ", author),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(text),
            ]));
        }
        lines
    };

    frame.render_widget(
        Paragraph::new(lines)
            .block(panel("Bluesky"))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let paragraph = match app.current_summary() {
        Some(text) => Paragraph::new(text.to_string()),
        None => Paragraph::new(Span::styled(
            "Press s to generate an analysis of this topic",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(
        paragraph
            .block(panel("Analysis"))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let text = app
        .status
        .clone()
        .unwrap_or_else(|| "/ topic  r refresh  s summary  e export  ? help  q quit".to_string());
    frame.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray))),
        area,
    );
}

//! Help overlay showing all keybindings
//!
//! Renders a centered modal overlay with keyboard shortcuts.

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Key bindings grouped by section
const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Topic",
        &[
            ("/", "Edit topic"),
            ("Enter", "Load edited topic"),
            ("Esc", "Cancel editing"),
        ],
    ),
    (
        "Actions",
        &[
            ("r", "Refresh data"),
            ("s", "Generate summary"),
            ("e", "Export CSV and PDF"),
            ("?", "Toggle this help"),
            ("q / Esc", "Quit application"),
        ],
    ),
];

const OVERLAY_WIDTH: u16 = 50;

/// Renders the help overlay on top of the current view
pub fn render(frame: &mut Frame) {
    let mut lines = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (title, keys) in SECTIONS {
        lines.push(Line::from(Span::styled(
            *title,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.extend(keys.iter().map(|(key, what)| help_line(key, what)));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "Press Esc or ? to close",
        Style::default().fg(Color::DarkGray),
    )));

    // Content plus the two border rows
    let height = lines.len() as u16 + 2;
    let overlay_area = centered_rect(OVERLAY_WIDTH, height, frame.area());
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(Paragraph::new(lines).block(block), overlay_area);
}

fn help_line(key: &str, description: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<12}", key), Style::default().fg(Color::Yellow)),
        Span::raw(description.to_string()),
    ])
}

/// A `width` x `height` rect centered in `area`, clipped to it
pub(crate) fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [rect] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    rect
}

//! UI rendering module for Trend Radar
//!
//! This module contains all the rendering logic for the terminal user interface,
//! using the ratatui library for TUI components.

pub mod dashboard;
pub mod digest;
pub mod help_overlay;
pub mod widgets;

pub use digest::digest;
pub use help_overlay::render as render_help_overlay;

use ratatui::Frame;

use crate::app::App;

/// Renders the dashboard and, when open, the help overlay on top
pub fn render(frame: &mut Frame, app: &App) {
    dashboard::render(frame, app);
    if app.show_help {
        render_help_overlay(frame);
    }
}

//! Daily-value sparkline widget for inline visualization

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Block characters for different value levels (8 levels)
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A one-row sparkline of a daily series
///
/// When the series is wider than the area, the most recent values are shown.
pub struct TrendSparkline<'a> {
    values: &'a [u64],
    /// Value drawn as a full block
    max_value: u64,
    /// Style for the sparkline
    style: Style,
    /// Style for the latest value
    marker_style: Style,
}

impl<'a> TrendSparkline<'a> {
    pub fn new(values: &'a [u64], max_value: u64) -> Self {
        Self {
            values,
            max_value,
            style: Style::default().fg(Color::Cyan),
            marker_style: Style::default().fg(Color::Yellow),
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    fn value_to_block(&self, value: u64) -> char {
        if self.max_value == 0 {
            return BLOCKS[0];
        }
        let normalized = (value as f64 / self.max_value as f64).clamp(0.0, 1.0);
        let index = ((normalized * 7.0).round() as usize).min(7);
        BLOCKS[index]
    }
}

impl<'a> Widget for TrendSparkline<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let start = self.values.len().saturating_sub(width);
        let visible = &self.values[start..];
        let last = visible.len().saturating_sub(1);

        for (i, value) in visible.iter().enumerate() {
            let block = self.value_to_block(*value);
            let x = area.x + i as u16;
            let y = area.y;

            let style = if i == last {
                self.marker_style
            } else {
                self.style
            };

            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char(block).set_style(style);
            }
        }
    }
}

//! PDF rendering of a [`Report`]
//!
//! A4 pages, builtin Helvetica, a vector line chart for the search-interest
//! series. Text is wrapped by an estimated glyph width and flows onto new
//! pages as needed.

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use super::report::{Report, Section};
use super::ExportError;
use crate::data::TimeSeries;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 10.0;

const CHART_HEIGHT: f32 = 55.0;

/// Millimetres per point
const PT_TO_MM: f32 = 0.3528;

/// Average Helvetica glyph width as a fraction of the font size
const AVG_GLYPH_EM: f32 = 0.5;

/// Characters of body text that fit on one line
fn chars_per_line(font_size: f32) -> usize {
    (CONTENT_WIDTH / (font_size * PT_TO_MM * AVG_GLYPH_EM)) as usize
}

fn line_height(font_size: f32) -> f32 {
    font_size * PT_TO_MM * 1.4
}

/// Greedy word wrap; words longer than a line are split
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }

    lines
}

/// Writes top to bottom, adding pages when the cursor runs out of room
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            font,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Starts a new page unless `height` more millimetres fit
    fn reserve(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn text(&mut self, text: &str, size: f32, bold: bool) {
        let height = line_height(size);
        self.reserve(height);
        self.y -= height;
        let font = if bold { &self.bold } else { &self.font };
        self.layer
            .use_text(text, size, Mm(MARGIN), Mm(self.y), font);
    }

    fn paragraph(&mut self, text: &str, size: f32) {
        for line in wrap_text(text, chars_per_line(size)) {
            self.text(&line, size, false);
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn stroke(&self, points: Vec<(f32, f32)>, gray: f32, thickness: f32) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(gray, gray, gray, None)));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: points
                .into_iter()
                .map(|(x, y)| (Point::new(Mm(x), Mm(y)), false))
                .collect(),
            is_closed: false,
        });
    }

    /// Axis frame plus the series scaled to the chart box
    fn chart(&mut self, series: &TimeSeries) {
        self.reserve(CHART_HEIGHT + line_height(BODY_SIZE));
        let top = self.y - 2.0;
        let bottom = top - CHART_HEIGHT;
        let left = MARGIN;
        let right = MARGIN + CONTENT_WIDTH;

        self.stroke(vec![(left, top), (left, bottom), (right, bottom)], 0.6, 0.5);

        let max = series.max().max(1) as f32;
        let n = series.len();
        let step = if n > 1 {
            CONTENT_WIDTH / (n - 1) as f32
        } else {
            0.0
        };
        let mut points: Vec<(f32, f32)> = series
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let x = left + step * i as f32;
                let y = bottom + CHART_HEIGHT * (p.value as f32 / max);
                (x, y)
            })
            .collect();
        if points.len() == 1 {
            let (_, y) = points[0];
            points.push((right, y));
        }
        if points.len() >= 2 {
            self.stroke(points, 0.0, 1.2);
        }

        self.y = bottom;
        if let (Some(first), Some(last)) = (series.points.first(), series.latest()) {
            self.text(
                &format!("{}  to  {}   (peak {})", first.date, last.date, series.max()),
                BODY_SIZE - 2.0,
                false,
            );
        }
    }

    fn finish(self) -> Result<Vec<u8>, ExportError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| ExportError::Pdf(e.to_string()))
    }
}

/// Renders the report to PDF bytes
pub fn render(report: &Report) -> Result<Vec<u8>, ExportError> {
    let mut out = PageWriter::new(&report.title)?;

    out.text(&report.title, TITLE_SIZE, true);
    out.text(
        &format!("Generated {}", report.generated_at.format("%Y-%m-%d %H:%M")),
        BODY_SIZE - 1.0,
        false,
    );
    out.gap(6.0);

    for section in &report.sections {
        out.text(section.heading(), HEADING_SIZE, true);
        out.gap(1.5);
        match section {
            Section::SearchInterest { series, current } => {
                out.text(&format!("Current score: {}/100", current), BODY_SIZE, false);
                out.chart(series);
            }
            Section::Pageviews { article, total } => {
                out.paragraph(
                    &format!("{} total views of \"{}\"", total, article),
                    BODY_SIZE,
                );
            }
            Section::Headlines(headlines) => {
                for headline in headlines {
                    out.paragraph(&format!("- {}", headline.title), BODY_SIZE);
                }
            }
            Section::Summary(text) => out.paragraph(text, BODY_SIZE),
        }
        out.gap(6.0);
    }

    out.finish()
}

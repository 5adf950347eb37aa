//! PDF deck renderer.
//!
//! Uses genpdf to render one page per slide: the generated background art
//! (when present), the slide text, and the slide's audio time span as a
//! muted footer annotation. PDF has no native word-level sync, so the
//! footer is metadata for the presenter, not a playback driver.

use std::io::Cursor;
use std::path::Path;

use genpdf::elements::{Break, Image, PageBreak, Paragraph};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Color, Style, StyledString};
use genpdf::{Document, Margins, SimplePageDecorator};
use tracing::{info, warn};

use super::{DeckRenderer, DeckSlide, ExportError};
use crate::transcript::TimeSpan;

/// Font sizes for slide output (in points).
const BODY_SIZE: u8 = 16;
const HEADING_SIZE: u8 = 10;
const FOOTER_SIZE: u8 = 8;

/// Page margins in mm.
const MARGIN_MM: f64 = 20.0;

/// Muted gray for the timing footer.
const FOOTER_COLOR: Color = Color::Rgb(140, 140, 140);

/// Candidate `(regular, bold)` font files, tried in order.
const FONT_CANDIDATES: &[(&str, &str)] = &[
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    ),
    (
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    ),
];

/// Built-in deck renderer producing a PDF file.
pub struct PdfDeckRenderer {
    title: String,
}

impl PdfDeckRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl DeckRenderer for PdfDeckRenderer {
    fn render(
        &self,
        slides: &[DeckSlide],
        audio_file_name: &str,
        out_path: &Path,
    ) -> Result<(), ExportError> {
        info!(
            path = %out_path.display(),
            slides = slides.len(),
            "Rendering PDF deck"
        );

        let font_family = load_font_family()?;
        let mut doc = Document::new(font_family);
        doc.set_title(&self.title);

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(Margins::trbl(MARGIN_MM, MARGIN_MM, MARGIN_MM, MARGIN_MM));
        doc.set_page_decorator(decorator);

        for (index, slide) in slides.iter().enumerate() {
            if index > 0 {
                doc.push(PageBreak::new());
            }

            // The original audio travels with the deck via a first-slide
            // reference; later slides carry only their own content.
            if index == 0 {
                let style = Style::new().bold().with_font_size(HEADING_SIZE);
                doc.push(Paragraph::new(StyledString::new(
                    format!("{} \u{2014} audio: {}", self.title, audio_file_name),
                    style,
                )));
                doc.push(Break::new(1.0));
            }

            match &slide.visual.image_png {
                Some(png) => match Image::from_reader(Cursor::new(png.as_slice())) {
                    Ok(image) => doc.push(image),
                    Err(e) => {
                        // Undecodable art is the same as no art: fall back.
                        warn!(slide = index, error = %e, "Slide image undecodable, using fallback");
                        push_fallback_rule(&mut doc, slide.visual.fallback_color);
                    }
                },
                None => push_fallback_rule(&mut doc, slide.visual.fallback_color),
            }
            doc.push(Break::new(0.5));

            for line in slide.chunk.text.lines() {
                let style = Style::new().with_font_size(BODY_SIZE);
                doc.push(Paragraph::new(StyledString::new(line, style)));
            }

            if let Some(span) = slide.chunk.span {
                doc.push(Break::new(0.5));
                let style = Style::new()
                    .with_font_size(FOOTER_SIZE)
                    .with_color(FOOTER_COLOR);
                doc.push(Paragraph::new(StyledString::new(format_span(&span), style)));
            }
        }

        doc.render_to_file(out_path)
            .map_err(|e| ExportError::Render(format!("{}: {e}", out_path.display())))?;

        info!(path = %out_path.display(), "PDF deck saved");
        Ok(())
    }
}

/// Stand-in for a background fill: genpdf cannot paint page backgrounds, so
/// the fallback color becomes a colored rule above the slide text.
fn push_fallback_rule(doc: &mut Document, (r, g, b): (u8, u8, u8)) {
    let style = Style::new()
        .with_font_size(BODY_SIZE)
        .with_color(Color::Rgb(r, g, b));
    doc.push(Paragraph::new(StyledString::new("\u{2587}".repeat(24), style)));
}

/// Format a slide's span as `m:ss – m:ss` for the footer annotation.
fn format_span(span: &TimeSpan) -> String {
    format!(
        "{} \u{2013} {}",
        format_secs(span.start),
        format_secs(span.end)
    )
}

fn format_secs(t: f64) -> String {
    let total = t.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Load a font family from common system font locations.
///
/// Bold files are optional; the regular face doubles for every missing
/// style, which is fine for slide text.
fn load_font_family() -> Result<FontFamily<FontData>, ExportError> {
    for (regular_path, bold_path) in FONT_CANDIDATES {
        let Ok(regular_bytes) = std::fs::read(regular_path) else {
            continue;
        };
        let bold_bytes = std::fs::read(bold_path).unwrap_or_else(|_| regular_bytes.clone());

        let face = |bytes: Vec<u8>, path: &str| {
            FontData::new(bytes, None)
                .map_err(|e| ExportError::Render(format!("Failed to parse font {path}: {e}")))
        };

        return Ok(FontFamily {
            regular: face(regular_bytes.clone(), regular_path)?,
            bold: face(bold_bytes.clone(), bold_path)?,
            italic: face(regular_bytes, regular_path)?,
            bold_italic: face(bold_bytes, bold_path)?,
        });
    }
    Err(ExportError::Render(
        "No usable system font found for PDF generation".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_span() {
        let span = TimeSpan::new(4.2, 72.6);
        assert_eq!(format_span(&span), "0:04 \u{2013} 1:13");
    }

    #[test]
    fn test_format_secs_clamps_negative() {
        assert_eq!(format_secs(-1.0), "0:00");
        assert_eq!(format_secs(600.0), "10:00");
    }
}

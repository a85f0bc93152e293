//! SVG drawing backend.
//!
//! Writes one standalone SVG document per page, sized in points. Encoded
//! payloads are embedded as data URIs, so SVG payloads remain vector; pixel
//! buffers are encoded to PNG first.
//!
//! # Example
//!
//! ```
//! use tilelayout::document::Document;
//! use tilelayout::render::export::export;
//! use tilelayout::svg::SvgSurface;
//!
//! let mut doc = Document::new();
//! doc.add_page();
//!
//! let mut svg = SvgSurface::new();
//! export(&doc, &mut svg).unwrap();
//! let pages = svg.into_pages();
//! assert_eq!(pages.len(), 2);
//! assert!(pages[0].starts_with("<svg"));
//! ```

use std::fmt::Write as _;

use tracing::warn;

use crate::geometry::{Rect, Size};
use crate::media::{ImageData, MediaType};
use crate::render::{Color, ImageSource, PageTarget, Stroke, Surface, TextRun};

const FONT_FAMILY: &str = r#""SF Mono", Menlo, Consolas, "DejaVu Sans Mono", monospace"#;

/// Collects pages as SVG document strings.
#[derive(Clone, Debug, Default)]
pub struct SvgSurface {
    pages: Vec<String>,
    current: Option<String>,
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finished pages. A page still open is closed first.
    pub fn into_pages(mut self) -> Vec<String> {
        self.end_page();
        self.pages
    }

    fn out(&mut self) -> &mut String {
        self.current.get_or_insert_with(|| header(Size::new(0.0, 0.0)))
    }

    fn image_href(image: ImageSource<'_>) -> Option<String> {
        match image {
            ImageSource::Encoded(data) => Some(data.to_data_url()),
            ImageSource::Pixels(raster) => match raster.to_png() {
                Ok(png) => Some(ImageData::new(MediaType::Png, png).to_data_url()),
                Err(err) => {
                    warn!(%err, "could not encode pixels for svg");
                    None
                }
            },
        }
    }
}

fn header(size: Size) -> String {
    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}pt" height="{h}pt" viewBox="0 0 {w} {h}">"#,
        w = fmt_num(size.width),
        h = fmt_num(size.height),
    );
    svg.push('\n');
    svg
}

/// Trim trailing zeros so output stays short and stable.
fn fmt_num(v: f64) -> String {
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn rect_attrs(rect: Rect) -> String {
    format!(
        r#"x="{}" y="{}" width="{}" height="{}""#,
        fmt_num(rect.x),
        fmt_num(rect.y),
        fmt_num(rect.width),
        fmt_num(rect.height)
    )
}

impl Surface for SvgSurface {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let line = format!(r#"<rect {} fill="{}"/>"#, rect_attrs(rect), color.hex());
        let out = self.out();
        out.push_str(&line);
        out.push('\n');
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: &Stroke) {
        let dash = stroke
            .dash
            .map(|(on, off)| format!(r#" stroke-dasharray="{},{}""#, fmt_num(on), fmt_num(off)))
            .unwrap_or_default();
        let line = format!(
            r#"<rect {} fill="none" stroke="{}" stroke-width="{}"{dash}/>"#,
            rect_attrs(rect),
            stroke.color.hex(),
            fmt_num(stroke.width),
        );
        let out = self.out();
        out.push_str(&line);
        out.push('\n');
    }

    fn draw_image(&mut self, rect: Rect, image: ImageSource<'_>) {
        let Some(href) = Self::image_href(image) else {
            return;
        };
        let line = format!(
            r#"<image {} preserveAspectRatio="xMidYMid meet" href="{href}"/>"#,
            rect_attrs(rect)
        );
        let out = self.out();
        out.push_str(&line);
        out.push('\n');
    }

    fn draw_text(&mut self, run: &TextRun<'_>) {
        // Baseline sits one font size below the top of the box.
        let line = format!(
            r#"<text x="{}" y="{}" font-size="{}" font-family='{FONT_FAMILY}' fill="{}" text-anchor="middle">{}</text>"#,
            fmt_num(run.rect.x + run.rect.width / 2.0),
            fmt_num(run.rect.y + run.font_size),
            fmt_num(run.font_size),
            run.color.hex(),
            escape_xml(run.text)
        );
        let out = self.out();
        out.push_str(&line);
        out.push('\n');
    }
}

impl PageTarget for SvgSurface {
    fn begin_page(&mut self, size: Size) {
        self.end_page();
        self.current = Some(header(size));
    }

    fn end_page(&mut self) {
        if let Some(mut svg) = self.current.take() {
            svg.push_str("</svg>\n");
            self.pages.push(svg);
        }
    }
}

/// Escape special characters for XML text content.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

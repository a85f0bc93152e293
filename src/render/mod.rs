//! Drawing seam and the three renderers built on it.
//!
//! Renderers turn a [`PagePlan`] into calls on a [`Surface`]. A surface is a
//! drawing backend: a host UI, the [`svg`](crate::svg) writer, or the
//! recording [`DisplayList`]. Paged output goes through [`PageTarget`], which
//! adds page boundaries.
//!
//! - [`canvas`]: interactive view with zoom, hit testing, selection and
//!   drag-to-reorder
//! - [`export`]: one output page per document page at true point size
//! - [`thumbnail`]: first page scaled into a bounding box

pub mod canvas;
pub mod export;
pub mod thumbnail;

use crate::geometry::{Rect, Size};
use crate::media::{ImageData, RasterImage};
use crate::plan::{CellPlan, ImageSlot, PagePlan, TextPlacement, TextRole};

/// Opaque RGB color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    /// Title and page number.
    pub const HEADER_TEXT: Color = Color::rgb(0x66, 0x66, 0x66);
    pub const CAPTION_TEXT: Color = Color::rgb(0x4d, 0x4d, 0x4d);
    /// Empty-cell outline.
    pub const GRID_LINE: Color = Color::rgb(0xe5, 0xe5, 0xe5);
    /// Canvas selection and drop-target outline.
    pub const ACCENT: Color = Color::rgb(0x3b, 0x82, 0xf6);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn for_text(role: TextRole) -> Self {
        match role {
            TextRole::Title | TextRole::PageNumber => Self::HEADER_TEXT,
            TextRole::Caption => Self::CAPTION_TEXT,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stroke {
    pub width: f64,
    pub color: Color,
    /// `(on, off)` dash lengths.
    pub dash: Option<(f64, f64)>,
}

impl Stroke {
    /// Dashed outline of an empty cell.
    pub const EMPTY_CELL: Stroke = Stroke {
        width: 0.75,
        color: Color::GRID_LINE,
        dash: Some((4.0, 4.0)),
    };

    pub const fn solid(width: f64, color: Color) -> Self {
        Self {
            width,
            color,
            dash: None,
        }
    }

    fn scaled(&self, scale: f64) -> Self {
        Self {
            width: self.width * scale,
            color: self.color,
            dash: self.dash.map(|(on, off)| (on * scale, off * scale)),
        }
    }
}

/// Pixels handed to [`Surface::draw_image`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ImageSource<'a> {
    /// Encoded payload, drawn as-is (vector payloads stay vector).
    Encoded(&'a ImageData),
    /// Already rasterized to the destination size.
    Pixels(&'a RasterImage),
}

/// One line of text centered horizontally in `rect`.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub rect: Rect,
    pub font_size: f64,
    pub color: Color,
}

/// A drawing backend. Coordinates are top-left origin, y down.
pub trait Surface {
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, stroke: &Stroke);
    fn draw_image(&mut self, rect: Rect, image: ImageSource<'_>);
    fn draw_text(&mut self, run: &TextRun<'_>);
}

/// A backend that produces a sequence of pages.
pub trait PageTarget: Surface {
    /// Start a page of `size` points. Drawing goes to this page until the
    /// next `begin_page` or `end_page`.
    fn begin_page(&mut self, size: Size);
    fn end_page(&mut self);
}

/// Maps drawing calls through a uniform scale and offset.
pub struct Transformed<'s, S: ?Sized> {
    inner: &'s mut S,
    scale: f64,
    dx: f64,
    dy: f64,
}

impl<'s, S: Surface + ?Sized> Transformed<'s, S> {
    pub fn new(inner: &'s mut S, scale: f64, dx: f64, dy: f64) -> Self {
        Self {
            inner,
            scale,
            dx,
            dy,
        }
    }

    pub fn map(&self, rect: Rect) -> Rect {
        rect.scale_translate(self.scale, self.dx, self.dy)
    }
}

impl<S: Surface + ?Sized> Surface for Transformed<'_, S> {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let rect = self.map(rect);
        self.inner.fill_rect(rect, color);
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: &Stroke) {
        let rect = self.map(rect);
        self.inner.stroke_rect(rect, &stroke.scaled(self.scale));
    }

    fn draw_image(&mut self, rect: Rect, image: ImageSource<'_>) {
        let rect = self.map(rect);
        self.inner.draw_image(rect, image);
    }

    fn draw_text(&mut self, run: &TextRun<'_>) {
        let run = TextRun {
            rect: self.map(run.rect),
            font_size: run.font_size * self.scale,
            ..run.clone()
        };
        self.inner.draw_text(&run);
    }
}

/// A recorded drawing call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Fill { rect: Rect, color: Color },
    Stroke { rect: Rect, stroke: Stroke },
    Image { rect: Rect, image: RecordedImage },
    Text {
        text: String,
        rect: Rect,
        font_size: f64,
        color: Color,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecordedImage {
    Encoded(ImageData),
    Pixels(RasterImage),
}

/// Records drawing calls, page by page.
///
/// Drawing before the first `begin_page` goes to an implicit first page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayList {
    pub pages: Vec<RecordedPage>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordedPage {
    pub size: Size,
    pub ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, op: DrawOp) {
        if self.pages.is_empty() {
            self.pages.push(RecordedPage::default());
        }
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    /// All ops across pages.
    pub fn ops(&self) -> impl Iterator<Item = &DrawOp> + '_ {
        self.pages.iter().flat_map(|p| p.ops.iter())
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.ops().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for DisplayList {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.push(DrawOp::Fill { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: &Stroke) {
        self.push(DrawOp::Stroke {
            rect,
            stroke: *stroke,
        });
    }

    fn draw_image(&mut self, rect: Rect, image: ImageSource<'_>) {
        let image = match image {
            ImageSource::Encoded(data) => RecordedImage::Encoded(data.clone()),
            ImageSource::Pixels(raster) => RecordedImage::Pixels(raster.clone()),
        };
        self.push(DrawOp::Image { rect, image });
    }

    fn draw_text(&mut self, run: &TextRun<'_>) {
        self.push(DrawOp::Text {
            text: run.text.to_string(),
            rect: run.rect,
            font_size: run.font_size,
            color: run.color,
        });
    }
}

impl PageTarget for DisplayList {
    fn begin_page(&mut self, size: Size) {
        self.pages.push(RecordedPage {
            size,
            ops: Vec::new(),
        });
    }

    fn end_page(&mut self) {}
}

fn draw_text<S: Surface + ?Sized>(surface: &mut S, text: &TextPlacement) {
    surface.draw_text(&TextRun {
        text: &text.text,
        rect: text.rect,
        font_size: text.font_size,
        color: Color::for_text(text.role),
    });
}

/// Paint everything on a planned page except image payloads, which go to
/// `draw_image` so each renderer can apply its own embedding policy.
///
/// Order: white page, header texts, then per cell the image, its caption or
/// the empty outline.
pub(crate) fn paint_page<S, F>(plan: &PagePlan<'_>, surface: &mut S, mut draw_image: F)
where
    S: Surface + ?Sized,
    F: FnMut(&mut S, &CellPlan<'_>, &ImageSlot<'_>),
{
    surface.fill_rect(Rect::from_size(plan.page_size), Color::WHITE);
    if let Some(title) = &plan.title {
        draw_text(surface, title);
    }
    if let Some(number) = &plan.page_number {
        draw_text(surface, number);
    }
    for cell in &plan.cells {
        match &cell.filled {
            Some(filled) => {
                draw_image(surface, cell, &filled.image);
                if let Some(caption) = &filled.caption {
                    draw_text(surface, caption);
                }
            }
            None if cell.empty_border => surface.stroke_rect(cell.rect, &Stroke::EMPTY_CELL),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transformed_scales_everything() {
        let mut list = DisplayList::new();
        let mut t = Transformed::new(&mut list, 2.0, 10.0, 20.0);
        t.fill_rect(Rect::new(1.0, 1.0, 3.0, 4.0), Color::WHITE);
        t.stroke_rect(Rect::new(0.0, 0.0, 1.0, 1.0), &Stroke::EMPTY_CELL);
        t.draw_text(&TextRun {
            text: "hi",
            rect: Rect::new(0.0, 0.0, 5.0, 5.0),
            font_size: 8.0,
            color: Color::CAPTION_TEXT,
        });

        let ops: Vec<_> = list.ops().cloned().collect();
        assert_eq!(
            ops[0],
            DrawOp::Fill {
                rect: Rect::new(12.0, 22.0, 6.0, 8.0),
                color: Color::WHITE
            }
        );
        match &ops[1] {
            DrawOp::Stroke { stroke, .. } => {
                assert_eq!(stroke.width, 1.5);
                assert_eq!(stroke.dash, Some((8.0, 8.0)));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &ops[2] {
            DrawOp::Text { font_size, .. } => assert_eq!(*font_size, 16.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn display_list_pages() {
        let mut list = DisplayList::new();
        list.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        list.begin_page(Size::new(10.0, 10.0));
        list.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        list.end_page();
        assert_eq!(list.pages.len(), 2);
        assert_eq!(list.pages[1].size, Size::new(10.0, 10.0));
        assert_eq!(list.ops().count(), 2);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(Color::GRID_LINE.hex(), "#e5e5e5");
        assert_eq!(Color::for_text(TextRole::Title).hex(), "#666666");
        assert_eq!(Color::for_text(TextRole::Caption).hex(), "#4d4d4d");
    }
}

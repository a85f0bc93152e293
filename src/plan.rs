//! Per-page placement plan.
//!
//! [`plan_page`] resolves everything the three renderers must agree on for
//! one page: which content sits in which cell, cell and image-fit
//! rectangles, caption strips, empty-cell borders, and the title and
//! page-number text boxes. Renderers walk the plan; none of them recompute
//! geometry.
//!
//! All rectangles are page points, top-left origin.

use crate::document::{CellContent, CellId, Document};
use crate::error::RenderError;
use crate::geometry::{
    self, CAPTION_FONT_PT, CAPTION_HEIGHT_PT, CAPTION_INSET_PT, GridMetrics, HEADER_FONT_PT,
    PAGE_NUMBER_BOTTOM_PT, Rect, Size, TITLE_TOP_PT,
};
use crate::media::ImageData;

/// Average advance of a monospace glyph, in ems.
const GLYPH_ADVANCE_EM: f64 = 0.6;

/// What a text box is for. Renderers pick color and face from this.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextRole {
    Title,
    PageNumber,
    Caption,
}

/// A single line of horizontally centered text.
#[derive(Clone, Debug, PartialEq)]
pub struct TextPlacement {
    pub text: String,
    /// Box the line is centered in; `y` is the top of the line.
    pub rect: Rect,
    pub font_size: f64,
    pub role: TextRole,
}

/// Image payload of a filled cell.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageSlot<'a> {
    /// Fitted into the cell's image area.
    Placed { data: &'a ImageData, rect: Rect },
    /// Payload present but its dimensions could not be read.
    Unreadable { data: &'a ImageData, reason: String },
    /// Content without a payload.
    Missing,
    /// Cell too short to show any image above its caption.
    NoRoom { data: &'a ImageData },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilledCell<'a> {
    pub content: &'a CellContent,
    /// Cell rect minus the caption strip, when captions are on.
    pub image_area: Rect,
    pub image: ImageSlot<'a>,
    pub caption: Option<TextPlacement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CellPlan<'a> {
    pub index: usize,
    pub id: &'a CellId,
    pub rect: Rect,
    pub filled: Option<FilledCell<'a>>,
    /// Draw the dashed empty-cell outline.
    pub empty_border: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PagePlan<'a> {
    pub page_index: usize,
    pub page_count: usize,
    pub page_size: Size,
    pub cells: Vec<CellPlan<'a>>,
    pub title: Option<TextPlacement>,
    pub page_number: Option<TextPlacement>,
}

impl PagePlan<'_> {
    pub fn cell(&self, index: usize) -> Option<&CellPlan<'_>> {
        self.cells.get(index)
    }

    /// Every text box on the page, header first.
    pub fn texts(&self) -> impl Iterator<Item = &TextPlacement> + '_ {
        self.title
            .iter()
            .chain(self.page_number.iter())
            .chain(
                self.cells
                    .iter()
                    .filter_map(|c| c.filled.as_ref()?.caption.as_ref()),
            )
    }
}

/// Resolve page `index` of `doc`.
pub fn plan_page(doc: &Document, index: usize) -> Result<PagePlan<'_>, RenderError> {
    let page_count = doc.page_count();
    let page = doc.pages().get(index).ok_or(RenderError::PageOutOfRange {
        index,
        len: page_count,
    })?;
    let geometry_err = |source| RenderError::Geometry {
        page: index,
        source,
    };

    let page_size = doc.page_size().size_pt();
    let metrics = GridMetrics::compute(doc.page_size(), page.grid()).map_err(geometry_err)?;
    let flags = doc.flags;

    let mut cells = Vec::with_capacity(page.capacity());
    for (i, (cell, rect)) in page.cells().iter().zip(metrics.rects()).enumerate() {
        let filled = match cell.content() {
            Some(content) => {
                let (image_area, strip) = geometry::caption_split(rect, flags.show_filenames);
                let image = match &content.image {
                    None => ImageSlot::Missing,
                    Some(data) => match data.aspect_ratio() {
                        Ok(_) if image_area.is_empty() => ImageSlot::NoRoom { data },
                        Ok(aspect) => ImageSlot::Placed {
                            data,
                            rect: geometry::image_fit_rect(image_area, aspect)
                                .map_err(geometry_err)?,
                        },
                        Err(err) => ImageSlot::Unreadable {
                            data,
                            reason: err.to_string(),
                        },
                    },
                };
                let caption = strip
                    .filter(|_| !content.filename.is_empty())
                    .map(|strip| caption_placement(&content.filename, strip));
                Some(FilledCell {
                    content,
                    image_area,
                    image,
                    caption,
                })
            }
            None => None,
        };
        cells.push(CellPlan {
            index: i,
            id: cell.id(),
            rect,
            empty_border: filled.is_none() && flags.show_grid_lines,
            filled,
        });
    }

    let header_box = |y: f64, text: String, role| TextPlacement {
        text,
        rect: Rect::new(0.0, y, page_size.width, HEADER_FONT_PT + 4.0),
        font_size: HEADER_FONT_PT,
        role,
    };
    let title = (!doc.title().is_empty())
        .then(|| header_box(TITLE_TOP_PT, doc.title().to_string(), TextRole::Title));
    let page_number = flags.show_page_numbers.then(|| {
        header_box(
            page_size.height - PAGE_NUMBER_BOTTOM_PT,
            page_label(index, page_count),
            TextRole::PageNumber,
        )
    });

    Ok(PagePlan {
        page_index: index,
        page_count,
        page_size,
        cells,
        title,
        page_number,
    })
}

/// `"{index+1}/{total}"`.
pub fn page_label(index: usize, total: usize) -> String {
    format!("{}/{}", index + 1, total)
}

fn caption_placement(filename: &str, strip: Rect) -> TextPlacement {
    TextPlacement {
        text: fit_text(filename, strip.width, CAPTION_FONT_PT),
        rect: Rect::new(
            strip.x,
            strip.y + CAPTION_INSET_PT,
            strip.width,
            CAPTION_HEIGHT_PT - CAPTION_INSET_PT,
        ),
        font_size: CAPTION_FONT_PT,
        role: TextRole::Caption,
    }
}

/// Shorten `text` with a trailing ellipsis so it fits `max_width` at
/// `font_size`, assuming monospace advances.
pub fn fit_text(text: &str, max_width: f64, font_size: f64) -> String {
    let advance = font_size * GLYPH_ADVANCE_EM;
    let fits = (max_width / advance).floor().max(0.0) as usize;
    let len = text.chars().count();
    if len <= fits {
        return text.to_string();
    }
    if fits == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(fits - 1).collect();
    out.push('…');
    out
}

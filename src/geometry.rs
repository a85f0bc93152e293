//! Page geometry: grid settings and page size to cell rectangles.
//!
//! Pure functions, no state. Every renderer (interactive canvas, paginated
//! export, thumbnail) derives its coordinates from here, so the formulas in
//! this module are the contract they share.
//!
//! Coordinates are PDF points with a top-left origin and y growing
//! downward. Adapters that draw into a bottom-up space flip on their own.
//!
//! # Example
//!
//! ```
//! use tilelayout::geometry::{cell_rects, GridSettings, PageSize};
//!
//! let rects = cell_rects(PageSize::A4, &GridSettings::new(2, 3, 5.0, 10.0)).unwrap();
//! assert_eq!(rects.len(), 6);
//! // Row-major: index 4 is row 1, column 1.
//! assert!(rects[4].x > rects[3].x);
//! assert!(rects[4].y > rects[0].y);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Points per millimeter.
pub const MM_TO_PT: f64 = 2.834645669;

/// Height of the filename strip reserved at the bottom of a cell.
pub const CAPTION_HEIGHT_PT: f64 = 12.0;
/// Gap between the image area and the caption baseline box.
pub const CAPTION_INSET_PT: f64 = 2.0;
/// Caption font size.
pub const CAPTION_FONT_PT: f64 = 8.0;

/// Top edge of the title text box.
pub const TITLE_TOP_PT: f64 = 15.0;
/// Distance from the page bottom to the top of the page-number text box.
pub const PAGE_NUMBER_BOTTOM_PT: f64 = 25.0;
/// Font size for title and page number.
pub const HEADER_FONT_PT: f64 = 10.0;

/// Largest row or column count a grid may have.
pub const MAX_GRID_DIM: u32 = 100;

/// Convert millimeters to points.
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * MM_TO_PT
}

/// Printable page size. Global to a document.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageSize {
    /// 210 × 297 mm.
    #[default]
    A4,
    /// 297 × 420 mm.
    A3,
}

impl PageSize {
    /// Width and height in millimeters.
    pub const fn size_mm(self) -> (f64, f64) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::A3 => (297.0, 420.0),
        }
    }

    /// Width and height in points.
    pub fn size_pt(self) -> Size {
        let (w, h) = self.size_mm();
        Size::new(mm_to_pt(w), mm_to_pt(h))
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::A3 => "A3",
        }
    }
}

/// Per-page grid configuration. `gap` and `margin` are millimeters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub rows: u32,
    pub cols: u32,
    pub gap: f64,
    pub margin: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 2,
            gap: 5.0,
            margin: 10.0,
        }
    }
}

impl GridSettings {
    pub const fn new(rows: u32, cols: u32, gap: f64, margin: f64) -> Self {
        Self {
            rows,
            cols,
            gap,
            margin,
        }
    }

    /// Number of cells the grid holds.
    pub fn capacity(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Same spacing, different shape.
    pub fn with_shape(self, rows: u32, cols: u32) -> Self {
        Self { rows, cols, ..self }
    }

    /// Check the field-level invariants (no page size involved).
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(GeometryError::EmptyGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.rows > MAX_GRID_DIM || self.cols > MAX_GRID_DIM {
            return Err(GeometryError::GridTooLarge {
                rows: self.rows,
                cols: self.cols,
                max: MAX_GRID_DIM,
            });
        }
        if !(self.gap.is_finite() && self.gap >= 0.0) {
            return Err(GeometryError::InvalidSpacing {
                field: "gap",
                value: self.gap,
            });
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(GeometryError::InvalidSpacing {
                field: "margin",
                value: self.margin,
            });
        }
        Ok(())
    }
}

/// Width × height in points.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Uniform scale that fits `self` inside `bounds`.
    pub fn fit_scale(&self, bounds: Size) -> f64 {
        (bounds.width / self.width).min(bounds.height / self.height)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, top-left origin.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Half-open containment: the right and bottom edges belong to the neighbor.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Split off a strip of `height` from the bottom. Returns `(rest, strip)`.
    pub fn split_bottom(&self, height: f64) -> (Rect, Rect) {
        let rest = Rect::new(self.x, self.y, self.width, self.height - height);
        let strip = Rect::new(self.x, self.y + rest.height, self.width, height);
        (rest, strip)
    }

    /// Map through a uniform scale followed by a translation.
    pub fn scale_translate(&self, scale: f64, dx: f64, dy: f64) -> Rect {
        Rect::new(
            self.x * scale + dx,
            self.y * scale + dy,
            self.width * scale,
            self.height * scale,
        )
    }
}

/// Resolved grid measurements for one page, in points.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridMetrics {
    pub rows: u32,
    pub cols: u32,
    pub margin: f64,
    pub gap: f64,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl GridMetrics {
    /// Resolve `grid` against `page_size`.
    ///
    /// Fails when the grid is empty, spacing is negative, or margins and gaps
    /// leave no positive room for a cell.
    pub fn compute(page_size: PageSize, grid: &GridSettings) -> Result<Self, GeometryError> {
        grid.validate()?;

        let page = page_size.size_pt();
        let margin = mm_to_pt(grid.margin);
        let gap = mm_to_pt(grid.gap);

        let content_width = page.width - 2.0 * margin;
        let content_height = page.height - 2.0 * margin;

        let cols = grid.cols as f64;
        let rows = grid.rows as f64;
        let cell_width = (content_width - gap * (cols - 1.0)) / cols;
        let cell_height = (content_height - gap * (rows - 1.0)) / rows;

        if !(cell_width > 0.0 && cell_height > 0.0) {
            return Err(GeometryError::CellTooSmall {
                cell_width,
                cell_height,
            });
        }

        Ok(Self {
            rows: grid.rows,
            cols: grid.cols,
            margin,
            gap,
            cell_width,
            cell_height,
        })
    }

    pub fn capacity(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Rectangle of the cell at row-major `index`. `None` past the end.
    pub fn cell_rect(&self, index: usize) -> Option<Rect> {
        if index >= self.capacity() {
            return None;
        }
        let row = (index / self.cols as usize) as f64;
        let col = (index % self.cols as usize) as f64;
        Some(Rect::new(
            self.margin + col * (self.cell_width + self.gap),
            self.margin + row * (self.cell_height + self.gap),
            self.cell_width,
            self.cell_height,
        ))
    }

    /// Cell index under `p`, or `None` in margins and gaps.
    pub fn cell_at(&self, p: Point) -> Option<usize> {
        let col = axis_slot(p.x - self.margin, self.cell_width, self.gap, self.cols)?;
        let row = axis_slot(p.y - self.margin, self.cell_height, self.gap, self.rows)?;
        Some(row * self.cols as usize + col)
    }

    pub fn rects(&self) -> Vec<Rect> {
        (0..self.capacity()).filter_map(|i| self.cell_rect(i)).collect()
    }
}

/// Which slot along one axis `offset` falls in, excluding gaps.
fn axis_slot(offset: f64, cell: f64, gap: f64, count: u32) -> Option<usize> {
    if offset < 0.0 {
        return None;
    }
    let pitch = cell + gap;
    let slot = (offset / pitch).floor();
    if slot >= count as f64 {
        return None;
    }
    if offset - slot * pitch >= cell {
        return None;
    }
    Some(slot as usize)
}

/// One rectangle per cell in row-major order (`index = row * cols + col`).
pub fn cell_rects(page_size: PageSize, grid: &GridSettings) -> Result<Vec<Rect>, GeometryError> {
    Ok(GridMetrics::compute(page_size, grid)?.rects())
}

/// Center an image of `image_aspect` (width / height) inside `container`,
/// scaled so it touches the container on one axis and stays inside on the
/// other.
///
/// When captions are on, the caller strips [`CAPTION_HEIGHT_PT`] from the
/// bottom of the cell first; see [`caption_split`].
pub fn image_fit_rect(container: Rect, image_aspect: f64) -> Result<Rect, GeometryError> {
    if container.is_empty() {
        return Err(GeometryError::EmptyContainer {
            width: container.width,
            height: container.height,
        });
    }
    if !(image_aspect.is_finite() && image_aspect > 0.0) {
        return Err(GeometryError::InvalidAspect(image_aspect));
    }

    let (width, height) = if image_aspect > container.width / container.height {
        (container.width, container.width / image_aspect)
    } else {
        (container.height * image_aspect, container.height)
    };

    Ok(Rect::new(
        container.x + (container.width - width) / 2.0,
        container.y + (container.height - height) / 2.0,
        width,
        height,
    ))
}

/// Split a cell into `(image_area, caption_strip)`.
pub fn caption_split(cell: Rect, show_caption: bool) -> (Rect, Option<Rect>) {
    if show_caption {
        let (image, strip) = cell.split_bottom(CAPTION_HEIGHT_PT);
        (image, Some(strip))
    } else {
        (cell, None)
    }
}

//! Interactive page view.
//!
//! [`Canvas`] shows one page at a zoom factor and offset, maps pointer
//! positions back to cells, and turns a drag from one cell to another into
//! [`Page::move_cell`](crate::document::Page::move_cell). Selection is held
//! by [`CellId`], so it stays with the slot when contents are swapped.
//!
//! The canvas never owns the document; every call borrows it.

use tracing::debug;

use super::{Color, ImageSource, Stroke, Surface, Transformed, paint_page};
use crate::config::{Preferences, clamp_zoom};
use crate::document::{CellContent, CellId, Document};
use crate::error::{EditError, RenderError};
use crate::geometry::{GridMetrics, Point, Size};
use crate::plan::{ImageSlot, plan_page};

const SELECTION_WIDTH: f64 = 2.0;

#[derive(Clone, Debug, PartialEq)]
struct Drag {
    source: CellId,
    hover: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Canvas {
    page: usize,
    zoom: f64,
    /// View position of the page's top-left corner.
    offset: Point,
    selected: Option<CellId>,
    drag: Option<Drag>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(&Preferences::default())
    }
}

impl Canvas {
    pub fn new(prefs: &Preferences) -> Self {
        Self {
            page: 0,
            zoom: clamp_zoom(prefs.zoom),
            offset: Point::default(),
            selected: None,
            drag: None,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Switch to another page. Selection and any drag in progress are dropped.
    pub fn show_page(&mut self, doc: &Document, index: usize) -> Result<(), RenderError> {
        if index >= doc.page_count() {
            return Err(RenderError::PageOutOfRange {
                index,
                len: doc.page_count(),
            });
        }
        self.page = index;
        self.selected = None;
        self.drag = None;
        Ok(())
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom, clamped. Returns the value in effect.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = clamp_zoom(zoom);
        self.zoom
    }

    pub fn set_offset(&mut self, offset: Point) {
        self.offset = offset;
    }

    /// On-screen size of the page at the current zoom.
    pub fn view_size(&self, doc: &Document) -> Size {
        let page = doc.page_size().size_pt();
        Size::new(page.width * self.zoom, page.height * self.zoom)
    }

    /// View coordinates to page points.
    pub fn to_page(&self, view: Point) -> Point {
        Point::new(
            (view.x - self.offset.x) / self.zoom,
            (view.y - self.offset.y) / self.zoom,
        )
    }

    /// Cell under a view position. `None` over margins, gaps, outside the
    /// page, or when the page's grid cannot be laid out.
    pub fn hit_test(&self, doc: &Document, view: Point) -> Option<usize> {
        let page = doc.pages().get(self.page)?;
        let metrics = GridMetrics::compute(doc.page_size(), page.grid()).ok()?;
        metrics.cell_at(self.to_page(view))
    }

    /// Select the cell under `view`, or clear the selection on a miss.
    pub fn select_at(&mut self, doc: &Document, view: Point) -> Option<&CellId> {
        self.selected = self
            .hit_test(doc, view)
            .and_then(|i| doc.pages()[self.page].cell(i))
            .map(|c| c.id().clone());
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&CellId> {
        self.selected.as_ref()
    }

    /// Index of the selected cell on the shown page, if it still exists.
    pub fn selected_index(&self, doc: &Document) -> Option<usize> {
        let id = self.selected.as_ref()?;
        doc.pages().get(self.page)?.position_of(id)
    }

    /// Empty the selected cell and hand back what it held.
    pub fn clear_selected(&mut self, doc: &mut Document) -> Result<Option<CellContent>, EditError> {
        let Some(index) = self.selected_index(doc) else {
            return Ok(None);
        };
        doc.page_mut(self.page)?.set_cell_content(index, None)
    }

    /// Start dragging the filled cell under `view`. Empty cells do not drag.
    pub fn begin_drag(&mut self, doc: &Document, view: Point) -> bool {
        let source = self
            .hit_test(doc, view)
            .and_then(|i| doc.pages()[self.page].cell(i))
            .filter(|c| !c.is_empty())
            .map(|c| c.id().clone());
        self.drag = source.map(|source| Drag {
            source,
            hover: None,
        });
        self.drag.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Track the pointer during a drag. Returns the cell it is over.
    pub fn drag_over(&mut self, doc: &Document, view: Point) -> Option<usize> {
        let hover = self.hit_test(doc, view);
        let drag = self.drag.as_mut()?;
        drag.hover = hover;
        hover
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Finish a drag over `view`, swapping source and target contents.
    /// Returns `(from, to)` when a move happened. Dropping outside any cell,
    /// back on the source, or after the source cell vanished does nothing.
    pub fn drop_at(
        &mut self,
        doc: &mut Document,
        view: Point,
    ) -> Result<Option<(usize, usize)>, EditError> {
        let Some(drag) = self.drag.take() else {
            return Ok(None);
        };
        let Some(to) = self.hit_test(doc, view) else {
            return Ok(None);
        };
        let page = doc.page_mut(self.page)?;
        let Some(from) = page.position_of(&drag.source) else {
            return Ok(None);
        };
        if from == to {
            return Ok(None);
        }
        page.move_cell(from, to)?;
        debug!(page = self.page, from, to, "moved cell");
        Ok(Some((from, to)))
    }

    /// Draw the shown page in view coordinates.
    pub fn render<S: Surface + ?Sized>(
        &self,
        doc: &Document,
        surface: &mut S,
    ) -> Result<(), RenderError> {
        let plan = plan_page(doc, self.page)?;
        let mut view = Transformed::new(surface, self.zoom, self.offset.x, self.offset.y);

        paint_page(&plan, &mut view, |surface, _, slot| {
            if let ImageSlot::Placed { data, rect } = slot {
                surface.draw_image(*rect, ImageSource::Encoded(*data));
            }
        });

        let highlight = Stroke::solid(SELECTION_WIDTH, Color::ACCENT);
        let selected = self.selected_index(doc);
        let hover = self.drag.as_ref().and_then(|d| d.hover);
        for index in selected.into_iter().chain(hover) {
            if let Some(cell) = plan.cell(index) {
                view.stroke_rect(cell.rect, &highlight);
            }
        }
        Ok(())
    }
}

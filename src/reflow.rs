//! Content-preserving grid changes and cell edits.
//!
//! Changing a page's shape never drops content. The page's contents are read
//! in canonical order (placed cells by index, then overflow), poured into the
//! new cells front to back, and whatever does not fit is parked in overflow
//! in the same order. Growing the grid again restores parked content first.
//!
//! Every operation validates before it touches anything, so a rejected edit
//! leaves the page exactly as it was.
//!
//! ```
//! use tilelayout::document::{CellContent, Document};
//! use tilelayout::media::{ImageData, MediaType};
//!
//! let mut doc = Document::new();
//! let items = (0..4u8).map(|n| {
//!     CellContent::new(format!("{n}.png"), "", ImageData::new(MediaType::Png, vec![n]))
//! });
//! doc.place_contents(items);
//!
//! doc.set_page_grid(0, 1, 1).unwrap();
//! assert_eq!(doc.pages()[0].overflow().len(), 3);
//!
//! doc.set_page_grid(0, 2, 2).unwrap();
//! assert!(doc.pages()[0].overflow().is_empty());
//! assert_eq!(doc.pages()[0].content_count(), 4);
//! ```

use tracing::debug;

use crate::document::{Cell, CellContent, Document, Page};
use crate::error::EditError;
use crate::geometry::{GridMetrics, GridSettings};

impl Page {
    /// Change the grid shape, keeping gap and margin.
    ///
    /// Cells are recreated with fresh ids. Content keeps its relative order;
    /// surplus goes to overflow.
    pub fn set_grid(&mut self, rows: u32, cols: u32) -> Result<(), EditError> {
        let grid = self.grid.with_shape(rows, cols);
        grid.validate()?;
        self.reflow(grid);
        Ok(())
    }

    /// Rebuild the cells for `grid`. Assumes `grid` is valid.
    pub(crate) fn reflow(&mut self, grid: GridSettings) {
        let before = (self.grid.rows, self.grid.cols);
        let after = (grid.rows, grid.cols);
        let mut queue = std::mem::take(&mut self.cells)
            .into_iter()
            .filter_map(|c| c.content)
            .chain(std::mem::take(&mut self.overflow));

        let cells: Vec<Cell> = (0..grid.capacity())
            .map(|_| Cell::new(queue.next()))
            .collect();
        let overflow: Vec<CellContent> = queue.collect();

        debug!(
            page = %self.id(),
            from = ?before,
            to = ?after,
            overflow = overflow.len(),
            "reflowed page"
        );
        self.cells = cells;
        self.overflow = overflow;
        self.grid = grid;
    }

    /// Move overflow into empty cells, in order, without reflowing placed
    /// content. Returns how many items were restored.
    pub fn restore_overflow(&mut self) -> usize {
        if self.overflow.is_empty() {
            return 0;
        }
        let mut parked = std::mem::take(&mut self.overflow).into_iter();
        let mut restored = 0;
        for cell in self.cells.iter_mut().filter(|c| c.content.is_none()) {
            let Some(content) = parked.next() else { break };
            cell.content = Some(content);
            restored += 1;
        }
        self.overflow = parked.collect();
        if restored > 0 {
            debug!(page = %self.id(), restored, remaining = self.overflow.len(), "restored overflow");
        }
        restored
    }

    /// Put `content` in the cell at `index` (or clear it with `None`).
    /// Returns whatever the cell held before.
    pub fn set_cell_content(
        &mut self,
        index: usize,
        content: Option<CellContent>,
    ) -> Result<Option<CellContent>, EditError> {
        let len = self.cells.len();
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(EditError::CellOutOfRange { index, len })?;
        Ok(std::mem::replace(&mut cell.content, content))
    }

    /// Swap the contents of two cells. Cell ids stay in place. Applying the
    /// same move twice restores the original page.
    pub fn move_cell(&mut self, from: usize, to: usize) -> Result<(), EditError> {
        let len = self.cells.len();
        for index in [from, to] {
            if index >= len {
                return Err(EditError::CellOutOfRange { index, len });
            }
        }
        if from != to {
            let moved = self.cells[from].content.take();
            let displaced = std::mem::replace(&mut self.cells[to].content, moved);
            self.cells[from].content = displaced;
        }
        Ok(())
    }
}

impl Document {
    /// Change one page's grid shape. The resulting cells must fit the
    /// document's page size.
    pub fn set_page_grid(&mut self, page: usize, rows: u32, cols: u32) -> Result<(), EditError> {
        let grid = self.page(page)?.grid().with_shape(rows, cols);
        self.set_grid_settings(page, grid)
    }

    /// Replace a page's grid settings. Spacing changes alone keep every cell
    /// and its content where it is; a shape change reflows.
    pub fn set_grid_settings(&mut self, page: usize, grid: GridSettings) -> Result<(), EditError> {
        GridMetrics::compute(self.page_size(), &grid)?;
        let target = self.page_mut(page)?;
        if (target.grid.rows, target.grid.cols) == (grid.rows, grid.cols) {
            target.grid = grid;
        } else {
            target.reflow(grid);
        }
        Ok(())
    }

    /// Swap contents between two cells, possibly on different pages.
    pub fn swap_cells(&mut self, a: (usize, usize), b: (usize, usize)) -> Result<(), EditError> {
        for (page, cell) in [a, b] {
            let len = self.page(page)?.capacity();
            if cell >= len {
                return Err(EditError::CellOutOfRange { index: cell, len });
            }
        }
        if a.0 == b.0 {
            return self.page_mut(a.0)?.move_cell(a.1, b.1);
        }
        let moved = self.page_mut(a.0)?.cells[a.1].content.take();
        let displaced = std::mem::replace(&mut self.page_mut(b.0)?.cells[b.1].content, moved);
        self.page_mut(a.0)?.cells[a.1].content = displaced;
        Ok(())
    }
}

//! Layout document model.
//!
//! A [`Document`] is an ordered list of [`Page`]s sharing one [`PageSize`].
//! Each page owns exactly `rows * cols` [`Cell`]s plus an overflow list of
//! content that did not fit after the grid shrank. Every [`CellContent`] sits
//! either in one cell or in one overflow list, never both and never neither.
//!
//! Page fields are private; all mutation goes through the methods here and in
//! [`reflow`](crate::reflow), which keep the cell count in step with the grid.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use tracing::debug;
use uuid::Uuid;

use crate::config::LayoutDefaults;
use crate::error::{EditError, GeometryError};
use crate::geometry::{GridMetrics, GridSettings, PageSize};
use crate::media::{ImageData, MediaType};

/// Stable cell identifier. Assigned once, never reused.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellId(String);

impl CellId {
    pub fn generate() -> Self {
        Self(format!("cell-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CellId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PageId(String);

impl PageId {
    pub fn generate() -> Self {
        Self(format!("page-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An image placed (or parked) on a page, with its source metadata.
///
/// `image` is `None` when the payload could not be resolved on load; the
/// filename and path are kept so the user can see what went missing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellContent {
    pub filename: String,
    pub original_path: String,
    pub image: Option<ImageData>,
}

impl CellContent {
    pub fn new(
        filename: impl Into<String>,
        original_path: impl Into<String>,
        image: ImageData,
    ) -> Self {
        Self {
            filename: filename.into(),
            original_path: original_path.into(),
            image: Some(image),
        }
    }

    /// Metadata only; the payload is unavailable.
    pub fn unresolved(filename: impl Into<String>, original_path: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            original_path: original_path.into(),
            image: None,
        }
    }

    /// Read an image file from disk. The media type comes from the file
    /// extension, or from the bytes when the extension is unknown.
    pub fn read_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let image = match MediaType::from_path(path) {
            Some(media_type) => ImageData::new(media_type, bytes),
            None => ImageData::sniffed(bytes),
        };
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(filename, path.to_string_lossy(), image))
    }

    /// Identical means byte-equal payloads; names may differ.
    pub fn is_identical(&self, other: &CellContent) -> bool {
        match (&self.image, &other.image) {
            (Some(a), Some(b)) => a.same_payload(b),
            _ => false,
        }
    }
}

/// One grid slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    id: CellId,
    pub(crate) content: Option<CellContent>,
}

impl Cell {
    /// Fresh cell with a newly generated id.
    pub fn new(content: Option<CellContent>) -> Self {
        Self {
            id: CellId::generate(),
            content,
        }
    }

    pub(crate) fn from_parts(id: CellId, content: Option<CellContent>) -> Self {
        Self { id, content }
    }

    pub fn id(&self) -> &CellId {
        &self.id
    }

    pub fn content(&self) -> Option<&CellContent> {
        self.content.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    id: PageId,
    pub(crate) cells: Vec<Cell>,
    pub(crate) grid: GridSettings,
    pub(crate) overflow: Vec<CellContent>,
}

impl Page {
    /// Empty page with `rows * cols` fresh cells.
    pub fn new(grid: GridSettings) -> Result<Self, GeometryError> {
        grid.validate()?;
        Ok(Self::blank(grid))
    }

    fn blank(grid: GridSettings) -> Self {
        Self {
            id: PageId::generate(),
            cells: (0..grid.capacity()).map(|_| Cell::new(None)).collect(),
            grid,
            overflow: Vec::new(),
        }
    }

    /// Assemble a page from stored parts. A cell list whose length does not
    /// match the grid is run through the reflow rule so no content is lost.
    pub(crate) fn from_parts(
        id: PageId,
        cells: Vec<Cell>,
        grid: GridSettings,
        overflow: Vec<CellContent>,
    ) -> Self {
        let mut page = Self {
            id,
            cells,
            grid,
            overflow,
        };
        if page.cells.len() != grid.capacity() {
            debug!(
                page = %page.id,
                stored = page.cells.len(),
                expected = grid.capacity(),
                "normalizing page cell count"
            );
            page.reflow(grid);
        }
        page
    }

    pub fn id(&self) -> &PageId {
        &self.id
    }

    pub fn grid(&self) -> &GridSettings {
        &self.grid
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Content parked after a shrink, in canonical order.
    pub fn overflow(&self) -> &[CellContent] {
        &self.overflow
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Index of the cell with `id`.
    pub fn position_of(&self, id: &CellId) -> Option<usize> {
        self.cells.iter().position(|c| c.id() == id)
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_empty())
            .map(|(i, _)| i)
    }

    /// Placed content in index order, then overflow.
    pub fn contents(&self) -> impl Iterator<Item = &CellContent> + '_ {
        self.cells
            .iter()
            .filter_map(|c| c.content.as_ref())
            .chain(self.overflow.iter())
    }

    pub fn content_count(&self) -> usize {
        self.contents().count()
    }
}

/// Document-wide display switches.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DisplayFlags {
    pub show_filenames: bool,
    pub show_grid_lines: bool,
    pub show_page_numbers: bool,
}

impl Default for DisplayFlags {
    fn default() -> Self {
        Self {
            show_filenames: true,
            show_grid_lines: true,
            show_page_numbers: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    page_size: PageSize,
    pages: Vec<Page>,
    pub flags: DisplayFlags,
    title: String,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// One empty page with the default 2×2 grid on A4.
    pub fn new() -> Self {
        Self::with_defaults(&LayoutDefaults::default())
    }

    /// One empty page using `defaults`. A default grid that is invalid, or
    /// leaves no room for cells on the default page size, falls back to the
    /// built-in grid.
    pub fn with_defaults(defaults: &LayoutDefaults) -> Self {
        let page = match GridMetrics::compute(defaults.page_size, &defaults.grid) {
            Ok(_) => Page::blank(defaults.grid),
            Err(err) => {
                debug!(%err, "default grid rejected, using built-in grid");
                Page::blank(GridSettings::default())
            }
        };
        Self {
            page_size: defaults.page_size,
            pages: vec![page],
            flags: DisplayFlags::default(),
            title: String::new(),
        }
    }

    pub(crate) fn from_parts(
        page_size: PageSize,
        pages: Vec<Page>,
        flags: DisplayFlags,
        title: String,
    ) -> Self {
        Self {
            page_size,
            pages,
            flags,
            title,
        }
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Change the page size. Rejected, with nothing changed, when some page's
    /// margins and gaps would leave no room for cells at the new size.
    pub fn set_page_size(&mut self, page_size: PageSize) -> Result<(), EditError> {
        for page in &self.pages {
            GridMetrics::compute(page_size, &page.grid)?;
        }
        self.page_size = page_size;
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Result<&Page, EditError> {
        let len = self.pages.len();
        self.pages
            .get(index)
            .ok_or(EditError::PageOutOfRange { index, len })
    }

    pub fn page_mut(&mut self, index: usize) -> Result<&mut Page, EditError> {
        let len = self.pages.len();
        self.pages
            .get_mut(index)
            .ok_or(EditError::PageOutOfRange { index, len })
    }

    /// Append an empty page with the last page's grid. Returns its index.
    pub fn add_page(&mut self) -> usize {
        let grid = self.pages.last().map(|p| p.grid).unwrap_or_default();
        self.pages.push(Page::blank(grid));
        self.pages.len() - 1
    }

    /// Remove a page and hand it back with its content. The last remaining
    /// page cannot be removed.
    pub fn remove_page(&mut self, index: usize) -> Result<Page, EditError> {
        let len = self.pages.len();
        if index >= len {
            return Err(EditError::PageOutOfRange { index, len });
        }
        if len == 1 {
            return Err(EditError::LastPage);
        }
        Ok(self.pages.remove(index))
    }

    /// Place contents into the first empty cells, page by page, adding
    /// pages as needed. Returns the index of the page that received the
    /// last item, or `None` when `contents` was empty.
    pub fn place_contents(
        &mut self,
        contents: impl IntoIterator<Item = CellContent>,
    ) -> Option<usize> {
        let mut queue = contents.into_iter().peekable();
        let mut last = None;
        let mut page_index = 0;
        while queue.peek().is_some() {
            if page_index == self.pages.len() {
                self.add_page();
            }
            let page = &mut self.pages[page_index];
            for cell in page.cells.iter_mut().filter(|c| c.content.is_none()) {
                match queue.next() {
                    Some(content) => {
                        cell.content = Some(content);
                        last = Some(page_index);
                    }
                    None => break,
                }
            }
            page_index += 1;
        }
        last
    }

    /// Every content item in the document, page by page, canonical order.
    pub fn contents(&self) -> impl Iterator<Item = &CellContent> + '_ {
        self.pages.iter().flat_map(|p| p.contents())
    }

    pub fn content_count(&self) -> usize {
        self.contents().count()
    }

    /// Structural invariants: cell counts match grids, grids are valid, and
    /// no cell id appears twice.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        !self.pages.is_empty()
            && self.pages.iter().all(|p| {
                p.grid.validate().is_ok()
                    && p.cells.len() == p.grid.capacity()
                    && p.cells.iter().all(|c| seen.insert(c.id().clone()))
            })
    }
}

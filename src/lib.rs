//! Tiled image page layouts.
//!
//! A [`Document`] is a sequence of pages; each page is a grid of cells and
//! each cell holds at most one image. Changing a page's grid reflows its
//! contents instead of dropping them, and contents that no longer fit are
//! kept aside until the grid grows again.
//!
//! # Modules
//!
//! - [`geometry`]: page sizes, grid settings, cell rectangles, image fitting
//! - [`document`]: the layout model (pages, cells, contents, display flags)
//! - [`reflow`]: grid changes, overflow, cell moves and swaps
//! - [`media`]: image payloads, media types, intrinsic sizes
//! - [`archive`]: `.tlp` container, legacy `.json` import, image packages
//! - [`plan`]: per-page placement shared by every renderer
//! - [`render`]: drawing seam plus canvas, export and thumbnail renderers
//! - [`config`]: preferences and defaults on disk
//!
//! # Example
//!
//! ```
//! use tilelayout::{CellContent, Document, ImageData, MediaType};
//!
//! let mut doc = Document::new();
//! let images = (0..6u8).map(|n| {
//!     CellContent::new(format!("{n}.png"), "", ImageData::new(MediaType::Png, vec![n]))
//! });
//! // Default grid is 2x2, so two images land on a second page.
//! assert_eq!(doc.place_contents(images), Some(1));
//! assert_eq!(doc.page_count(), 2);
//!
//! // Shrinking parks content aside; nothing is lost.
//! doc.set_page_grid(0, 1, 2).unwrap();
//! assert_eq!(doc.pages()[0].overflow().len(), 2);
//! assert_eq!(doc.content_count(), 6);
//! ```

#![forbid(unsafe_code)]

pub mod archive;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod media;
pub mod plan;
pub mod reflow;
pub mod render;
#[cfg(feature = "svg")]
pub mod svg;

pub use archive::{DecodeReport, Loaded, decode, encode, open, save};
pub use config::{Config, LayoutDefaults, Preferences};
pub use document::{Cell, CellContent, CellId, DisplayFlags, Document, Page, PageId};
pub use error::{ArchiveError, ConfigError, EditError, GeometryError, MediaError, RenderError};
pub use geometry::{GridMetrics, GridSettings, PageSize, Point, Rect, Size};
pub use media::{ImageData, MediaType};
pub use render::{PageTarget, Surface};

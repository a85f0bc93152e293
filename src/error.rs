//! Error types.
//!
//! Each concern has its own enum. Content that cannot be resolved while
//! decoding (a missing image) is not an error: the decoder recovers per
//! occurrence and reports it in [`DecodeReport`](crate::archive::DecodeReport).

use thiserror::Error;

/// Geometry could not be resolved for a page or a cell.
#[derive(Copy, Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("grid needs at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: u32, cols: u32 },

    #[error("grid of {rows}x{cols} exceeds {max} rows or columns")]
    GridTooLarge { rows: u32, cols: u32, max: u32 },

    #[error("{field} must be a finite, non-negative length (got {value})")]
    InvalidSpacing { field: &'static str, value: f64 },

    #[error("margins and gaps leave no room for cells ({cell_width:.2}pt x {cell_height:.2}pt)")]
    CellTooSmall { cell_width: f64, cell_height: f64 },

    #[error("container has no area ({width:.2}pt x {height:.2}pt)")]
    EmptyContainer { width: f64, height: f64 },

    #[error("image aspect ratio must be positive (got {0})")]
    InvalidAspect(f64),
}

/// A document or page mutation was rejected. The target is left unchanged.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EditError {
    #[error("page index {index} out of range ({len} pages)")]
    PageOutOfRange { index: usize, len: usize },

    #[error("cell index {index} out of range ({len} cells)")]
    CellOutOfRange { index: usize, len: usize },

    #[error("cannot remove the only page of a document")]
    LastPage,

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Image payload could not be inspected or rasterized.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported media type: {0}")]
    Unsupported(String),

    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("svg parse failed: {0}")]
    Svg(String),

    #[error("image has no intrinsic size")]
    ZeroSize,

    #[error("cannot rasterize to {width}x{height}")]
    RasterTarget { width: u32, height: u32 },
}

/// Failure reading or writing a container or legacy manifest.
///
/// `InvalidContainer`, `MissingManifest` and `MalformedManifest` are the
/// format errors: the load is abandoned and no document is produced.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("not a valid container: {0}")]
    InvalidContainer(String),

    #[error("not a valid container: manifest entry `{0}` is missing")]
    MissingManifest(&'static str),

    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("container write failed: {0}")]
    Write(#[source] zip::result::ZipError),
}

impl ArchiveError {
    /// True for the errors that mean "this file is not a readable layout".
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidContainer(_) | Self::MissingManifest(_) | Self::MalformedManifest(_)
        )
    }
}

/// A render call could not complete.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("page index {index} out of range ({len} pages)")]
    PageOutOfRange { index: usize, len: usize },

    #[error("page {page}: {source}")]
    Geometry {
        page: usize,
        #[source]
        source: GeometryError,
    },

    #[error("target box has no area ({width}x{height})")]
    EmptyTarget { width: f64, height: f64 },
}

/// Configuration could not be loaded or saved.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

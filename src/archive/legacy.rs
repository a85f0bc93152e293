//! Plain `.json` layouts with payloads embedded inline as data URLs.
//!
//! Older files predate per-page grids (they carry one top-level
//! `rows`/`cols`/`gap`/`margin`) and mix view state (`darkMode`, `zoom`) into
//! the document. Grids fall back page by page; view state is lifted out into
//! [`Preferences`].

use serde::Deserialize;
use tracing::{debug, warn};

use super::manifest::ManifestFlags;
use super::{DecodeReport, DocumentBuilder, Loaded, MissingImage};
use crate::config::{Preferences, clamp_zoom};
use crate::document::CellContent;
use crate::error::ArchiveError;
use crate::geometry::{GridSettings, PageSize};
use crate::media::ImageData;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyLayout {
    #[serde(default)]
    page_size: PageSize,
    pages: Vec<LegacyPage>,
    rows: Option<u32>,
    cols: Option<u32>,
    gap: Option<f64>,
    margin: Option<f64>,
    #[serde(flatten)]
    flags: ManifestFlags,
    dark_mode: Option<bool>,
    zoom: Option<f64>,
}

impl LegacyLayout {
    /// Grid for pages that do not carry their own.
    fn fallback_grid(&self) -> GridSettings {
        let d = GridSettings::default();
        GridSettings::new(
            self.rows.unwrap_or(d.rows),
            self.cols.unwrap_or(d.cols),
            self.gap.unwrap_or(d.gap),
            self.margin.unwrap_or(d.margin),
        )
    }

    fn preferences(&self) -> Option<Preferences> {
        if self.dark_mode.is_none() && self.zoom.is_none() {
            return None;
        }
        let mut prefs = Preferences::default();
        if let Some(dark) = self.dark_mode {
            prefs.dark_mode = dark;
        }
        if let Some(zoom) = self.zoom {
            prefs.zoom = clamp_zoom(zoom);
        }
        Some(prefs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPage {
    id: Option<String>,
    #[serde(default)]
    cells: Vec<LegacyCell>,
    grid_settings: Option<GridSettings>,
    #[serde(default)]
    hidden_content: Vec<LegacyContent>,
}

#[derive(Debug, Deserialize)]
struct LegacyCell {
    id: Option<String>,
    content: Option<LegacyContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyContent {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    original_path: String,
    image_data: Option<String>,
}

impl LegacyContent {
    fn resolve(self, page: usize, report: &mut DecodeReport) -> CellContent {
        let Some(url) = self.image_data else {
            return CellContent::unresolved(self.filename, self.original_path);
        };
        match ImageData::from_data_url(&url) {
            Some(image) => CellContent {
                filename: self.filename,
                original_path: self.original_path,
                image: Some(image),
            },
            None => {
                warn!(page, filename = %self.filename, "unreadable inline image");
                report.missing.push(MissingImage {
                    page,
                    filename: self.filename.clone(),
                    reference: None,
                });
                CellContent::unresolved(self.filename, self.original_path)
            }
        }
    }
}

/// Parse a legacy `.json` layout.
pub fn decode_legacy(bytes: &[u8]) -> Result<Loaded, ArchiveError> {
    let layout: LegacyLayout = serde_json::from_slice(bytes)
        .map_err(|e| ArchiveError::MalformedManifest(e.to_string()))?;
    let fallback = layout.fallback_grid();
    let preferences = layout.preferences();

    let mut builder = DocumentBuilder::default();
    for (index, page) in layout.pages.into_iter().enumerate() {
        let grid = page.grid_settings.unwrap_or(fallback);
        let cells = page
            .cells
            .into_iter()
            .map(|cell| {
                let content = cell
                    .content
                    .map(|c| c.resolve(index, &mut builder.report));
                (cell.id, content)
            })
            .collect();
        let overflow = page
            .hidden_content
            .into_iter()
            .map(|c| c.resolve(index, &mut builder.report))
            .collect();
        builder.push_page(page.id, cells, grid, overflow)?;
    }

    let (document, report) = builder.finish(layout.page_size, layout.flags)?;
    debug!(
        pages = document.page_count(),
        migrated_preferences = preferences.is_some(),
        "decoded legacy layout"
    );
    Ok(Loaded {
        document,
        report,
        preferences,
    })
}

//! Serialized shapes of `layout.json`.
//!
//! Field names are camelCase on the wire. Optional document flags default the
//! same way the document does; unknown fields are ignored.

use serde::{Deserialize, Serialize};

use crate::document::DisplayFlags;
use crate::geometry::{GridSettings, PageSize};

/// Container manifest: the document with payloads replaced by `imageRef`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Manifest {
    pub page_size: PageSize,
    pub pages: Vec<ManifestPage>,
    #[serde(flatten)]
    pub flags: ManifestFlags,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ManifestPage {
    pub id: String,
    pub cells: Vec<ManifestCell>,
    pub grid_settings: GridSettings,
    #[serde(default)]
    pub hidden_content: Vec<ManifestContent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ManifestCell {
    pub id: String,
    pub content: Option<ManifestContent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ManifestContent {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub original_path: String,
    pub image_ref: Option<String>,
    /// MIME type, written only when the ref's extension cannot express it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Document-level flags shared by both manifest forms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ManifestFlags {
    #[serde(default = "yes")]
    pub show_filenames: bool,
    #[serde(default = "yes")]
    pub show_grid_lines: bool,
    #[serde(default)]
    pub show_page_numbers: bool,
    #[serde(default)]
    pub title: String,
}

fn yes() -> bool {
    true
}

impl ManifestFlags {
    pub fn new(flags: DisplayFlags, title: &str) -> Self {
        Self {
            show_filenames: flags.show_filenames,
            show_grid_lines: flags.show_grid_lines,
            show_page_numbers: flags.show_page_numbers,
            title: title.to_string(),
        }
    }

    pub fn display(&self) -> DisplayFlags {
        DisplayFlags {
            show_filenames: self.show_filenames,
            show_grid_lines: self.show_grid_lines,
            show_page_numbers: self.show_page_numbers,
        }
    }
}

/// `layout.json` written by the collect package: filenames only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PackageLayout {
    pub pages: Vec<PackagePage>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PackagePage {
    pub cells: Vec<PackageCell>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PackageCell {
    pub filename: Option<String>,
}

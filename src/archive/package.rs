//! Collect a layout's images for hand-off.
//!
//! A package is every distinct image on the document's pages written under
//! its own filename, plus a `layout.json` listing which file sits in which
//! cell. It is an export, not a save: there is no way back to a [`Document`]
//! from a package.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::path::Path;

use bytes::Bytes;
use tracing::debug;
use zip::write::SimpleFileOptions;

use super::MANIFEST_ENTRY;
use super::manifest::{PackageCell, PackageLayout, PackagePage};
use crate::document::{CellContent, Document};
use crate::error::ArchiveError;

/// Where the package goes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PackageFormat {
    /// A single zip file.
    Zip,
    /// A directory, created if needed.
    Directory,
}

/// Files written, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackageSummary {
    pub files: Vec<String>,
}

struct Collected {
    files: Vec<(String, Bytes)>,
    layout: PackageLayout,
}

/// Assign a unique filename to each distinct payload on the pages.
fn collect_files(doc: &Document) -> Collected {
    let mut by_bytes: HashMap<Bytes, String> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();
    let mut files = Vec::new();

    let mut name_for = |content: &CellContent| -> Option<String> {
        let image = content.image.as_ref()?;
        if let Some(name) = by_bytes.get(image.bytes()) {
            return Some(name.clone());
        }
        let base = sanitize(&content.filename)
            .unwrap_or_else(|| format!("image_{}.{}", files.len(), image.media_type().extension()));
        let name = unique_name(&base, &taken);
        taken.insert(name.clone());
        by_bytes.insert(image.bytes().clone(), name.clone());
        files.push((name.clone(), image.bytes().clone()));
        Some(name)
    };

    let pages = doc
        .pages()
        .iter()
        .map(|page| PackagePage {
            cells: page
                .cells()
                .iter()
                .map(|cell| PackageCell {
                    filename: cell.content().and_then(&mut name_for),
                })
                .collect(),
        })
        .collect();

    Collected {
        files,
        layout: PackageLayout { pages },
    }
}

/// Last path component of `filename`, if any.
fn sanitize(filename: &str) -> Option<String> {
    let name = Path::new(filename).file_name()?.to_str()?;
    (!name.is_empty() && name != MANIFEST_ENTRY).then(|| name.to_string())
}

/// `base`, or `stem-2.ext`, `stem-3.ext`... until unused.
fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    };
    (2..)
        .map(|n| match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Write the package for `doc` to `dest`.
pub fn collect(
    doc: &Document,
    dest: impl AsRef<Path>,
    format: PackageFormat,
) -> Result<PackageSummary, ArchiveError> {
    let dest = dest.as_ref();
    let Collected { files, layout } = collect_files(doc);
    let layout_json = serde_json::to_vec_pretty(&layout)
        .map_err(|e| ArchiveError::MalformedManifest(e.to_string()))?;

    match format {
        PackageFormat::Zip => {
            let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            for (name, bytes) in &files {
                zip.start_file(name.as_str(), options)
                    .map_err(ArchiveError::Write)?;
                zip.write_all(bytes)?;
            }
            zip.start_file(MANIFEST_ENTRY, options)
                .map_err(ArchiveError::Write)?;
            zip.write_all(&layout_json)?;
            let out = zip.finish().map_err(ArchiveError::Write)?.into_inner();
            std::fs::write(dest, out)?;
        }
        PackageFormat::Directory => {
            std::fs::create_dir_all(dest)?;
            for (name, bytes) in &files {
                std::fs::write(dest.join(name), bytes)?;
            }
            std::fs::write(dest.join(MANIFEST_ENTRY), &layout_json)?;
        }
    }

    debug!(dest = %dest.display(), ?format, files = files.len(), "wrote package");
    Ok(PackageSummary {
        files: files.into_iter().map(|(name, _)| name).collect(),
    })
}

//! Single-file layout container.
//!
//! A container is a zip holding `layout.json` (the document, with every
//! image payload replaced by a symbolic `imageRef`) and one `images/<ref>`
//! entry per distinct payload. Byte-identical payloads share one ref no
//! matter how many cells show them or what each occurrence is called.
//!
//! ```
//! use tilelayout::archive;
//! use tilelayout::document::{CellContent, Document};
//! use tilelayout::media::{ImageData, MediaType};
//!
//! let mut doc = Document::new();
//! let payload = ImageData::new(MediaType::Png, vec![1, 2, 3]);
//! doc.place_contents([
//!     CellContent::new("a.png", "/a.png", payload.clone()),
//!     CellContent::new("b.png", "/b.png", payload),
//! ]);
//!
//! let bytes = archive::encode(&doc).unwrap();
//! let decoded = archive::decode(&bytes).unwrap();
//! assert_eq!(decoded.document.content_count(), 2);
//! assert!(decoded.report.missing.is_empty());
//! ```
//!
//! Unresolvable image refs do not fail a load. The affected content keeps
//! its filename and path, loses its payload, and is listed in
//! [`DecodeReport::missing`].

mod legacy;
mod manifest;
pub mod package;

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

use crate::config::Preferences;
use crate::document::{Cell, CellContent, CellId, Document, Page, PageId};
use crate::error::ArchiveError;
use crate::geometry::{GridSettings, PageSize};
use crate::media::{ImageData, MediaType};

pub use legacy::decode_legacy;

use manifest::{Manifest, ManifestCell, ManifestContent, ManifestFlags, ManifestPage};

/// Manifest entry name inside a container.
pub const MANIFEST_ENTRY: &str = "layout.json";
/// Directory prefix of the image store.
pub const IMAGE_DIR: &str = "images/";
/// File extension of the container form.
pub const CONTAINER_EXTENSION: &str = "tlp";
/// File extension of the legacy inline-payload form.
pub const LEGACY_EXTENSION: &str = "json";

/// Content whose payload could not be recovered during a load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingImage {
    pub page: usize,
    pub filename: String,
    /// The unresolved `imageRef`, or `None` for legacy inline payloads that
    /// failed to parse.
    pub reference: Option<String>,
}

/// What a load recovered from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub missing: Vec<MissingImage>,
    /// Pages whose stored cell count did not match their grid.
    pub normalized_pages: Vec<usize>,
}

impl DecodeReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.normalized_pages.is_empty()
    }
}

/// A decoded document plus everything the load had to work around.
#[derive(Clone, Debug)]
pub struct Loaded {
    pub document: Document,
    pub report: DecodeReport,
    /// View preferences found in a legacy file, if any.
    pub preferences: Option<Preferences>,
}

/// Distinct payloads in first-seen order.
#[derive(Default)]
struct ImageStore {
    refs: HashMap<Bytes, String>,
    entries: Vec<(String, Bytes)>,
}

impl ImageStore {
    fn intern(&mut self, data: &ImageData) -> String {
        if let Some(name) = self.refs.get(data.bytes()) {
            return name.clone();
        }
        let name = format!(
            "image_{}.{}",
            self.entries.len(),
            data.media_type().extension()
        );
        self.refs.insert(data.bytes().clone(), name.clone());
        self.entries.push((name.clone(), data.bytes().clone()));
        name
    }
}

fn manifest_content(content: &CellContent, store: &mut ImageStore) -> ManifestContent {
    ManifestContent {
        filename: content.filename.clone(),
        original_path: content.original_path.clone(),
        image_ref: content.image.as_ref().map(|data| store.intern(data)),
        media_type: content
            .image
            .as_ref()
            .and_then(|data| match data.media_type() {
                MediaType::Other(mime) => Some(mime.clone()),
                _ => None,
            }),
    }
}

/// Serialize `doc` to container bytes.
pub fn encode(doc: &Document) -> Result<Vec<u8>, ArchiveError> {
    let mut store = ImageStore::default();
    let pages = doc
        .pages()
        .iter()
        .map(|page| ManifestPage {
            id: page.id().to_string(),
            cells: page
                .cells()
                .iter()
                .map(|cell| ManifestCell {
                    id: cell.id().to_string(),
                    content: cell.content().map(|c| manifest_content(c, &mut store)),
                })
                .collect(),
            grid_settings: *page.grid(),
            hidden_content: page
                .overflow()
                .iter()
                .map(|c| manifest_content(c, &mut store))
                .collect(),
        })
        .collect();
    let manifest = Manifest {
        page_size: doc.page_size(),
        pages,
        flags: ManifestFlags::new(doc.flags, doc.title()),
    };
    let json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| ArchiveError::MalformedManifest(e.to_string()))?;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let deflated =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file(MANIFEST_ENTRY, deflated)
        .map_err(ArchiveError::Write)?;
    zip.write_all(&json)?;
    for (name, bytes) in &store.entries {
        zip.start_file(format!("{IMAGE_DIR}{name}"), stored)
            .map_err(ArchiveError::Write)?;
        zip.write_all(bytes)?;
    }
    let out = zip.finish().map_err(ArchiveError::Write)?.into_inner();

    debug!(
        pages = doc.page_count(),
        payloads = store.entries.len(),
        bytes = out.len(),
        "encoded container"
    );
    Ok(out)
}

/// Parse container bytes into a document.
pub fn decode(bytes: &[u8]) -> Result<Loaded, ArchiveError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ArchiveError::InvalidContainer(e.to_string()))?;

    let manifest_bytes = match zip.by_name(MANIFEST_ENTRY) {
        Ok(mut entry) => {
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            buf
        }
        Err(ZipError::FileNotFound) => return Err(ArchiveError::MissingManifest(MANIFEST_ENTRY)),
        Err(e) => return Err(ArchiveError::InvalidContainer(e.to_string())),
    };
    let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| ArchiveError::MalformedManifest(e.to_string()))?;

    let store = read_store(&mut zip);
    let mut builder = DocumentBuilder::default();
    for (index, page) in manifest.pages.into_iter().enumerate() {
        let cells = page
            .cells
            .into_iter()
            .map(|cell| {
                let content = cell
                    .content
                    .map(|c| resolve_ref(c, &store, index, &mut builder.report));
                (Some(cell.id), content)
            })
            .collect();
        let overflow = page
            .hidden_content
            .into_iter()
            .map(|c| resolve_ref(c, &store, index, &mut builder.report))
            .collect();
        builder.push_page(Some(page.id), cells, page.grid_settings, overflow)?;
    }

    let (document, report) = builder.finish(manifest.page_size, manifest.flags)?;
    debug!(
        pages = document.page_count(),
        payloads = store.len(),
        missing = report.missing.len(),
        "decoded container"
    );
    Ok(Loaded {
        document,
        report,
        preferences: None,
    })
}

/// Read every `images/` entry. Unreadable entries are skipped; the refs
/// pointing at them surface as missing.
fn read_store(zip: &mut zip::ZipArchive<Cursor<&[u8]>>) -> HashMap<String, Bytes> {
    let mut store = HashMap::new();
    for i in 0..zip.len() {
        let mut entry = match zip.by_index(i) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(index = i, %err, "skipping unreadable container entry");
                continue;
            }
        };
        if !entry.is_file() {
            continue;
        }
        let Some(name) = entry.name().strip_prefix(IMAGE_DIR).map(str::to_string) else {
            continue;
        };
        // The declared size comes from the file; grow as bytes actually arrive.
        let mut buf = Vec::new();
        match entry.read_to_end(&mut buf) {
            Ok(_) => {
                store.insert(name, Bytes::from(buf));
            }
            Err(err) => warn!(entry = %name, %err, "skipping unreadable image entry"),
        }
    }
    store
}

fn resolve_ref(
    content: ManifestContent,
    store: &HashMap<String, Bytes>,
    page: usize,
    report: &mut DecodeReport,
) -> CellContent {
    let Some(reference) = content.image_ref else {
        return CellContent::unresolved(content.filename, content.original_path);
    };
    match store.get(&reference) {
        Some(bytes) => {
            let declared = content
                .media_type
                .as_deref()
                .map(MediaType::from_mime)
                .or_else(|| MediaType::from_path(&reference));
            let image = match declared {
                Some(media_type) => ImageData::new(media_type, bytes.clone()),
                None => ImageData::sniffed(bytes.clone()),
            };
            CellContent {
                filename: content.filename,
                original_path: content.original_path,
                image: Some(image),
            }
        }
        None => {
            warn!(page, reference = %reference, filename = %content.filename, "image missing from container");
            report.missing.push(MissingImage {
                page,
                filename: content.filename.clone(),
                reference: Some(reference),
            });
            CellContent::unresolved(content.filename, content.original_path)
        }
    }
}

/// Shared page assembly for both manifest forms.
#[derive(Default)]
pub(crate) struct DocumentBuilder {
    pages: Vec<Page>,
    seen_cells: HashSet<String>,
    seen_pages: HashSet<String>,
    pub(crate) report: DecodeReport,
}

impl DocumentBuilder {
    /// Add a page. Missing or duplicate ids are replaced with fresh ones.
    pub(crate) fn push_page(
        &mut self,
        id: Option<String>,
        cells: Vec<(Option<String>, Option<CellContent>)>,
        grid: GridSettings,
        overflow: Vec<CellContent>,
    ) -> Result<(), ArchiveError> {
        let index = self.pages.len();
        grid.validate()
            .map_err(|e| ArchiveError::MalformedManifest(format!("page {index}: {e}")))?;

        let page_id = match id {
            Some(id) if !id.is_empty() && self.seen_pages.insert(id.clone()) => PageId::from(id),
            _ => PageId::generate(),
        };
        let cells: Vec<Cell> = cells
            .into_iter()
            .map(|(id, content)| {
                let id = match id {
                    Some(id) if !id.is_empty() && self.seen_cells.insert(id.clone()) => {
                        CellId::from(id)
                    }
                    _ => CellId::generate(),
                };
                Cell::from_parts(id, content)
            })
            .collect();

        if cells.len() != grid.capacity() {
            warn!(
                page = index,
                stored = cells.len(),
                expected = grid.capacity(),
                "cell count does not match grid, reflowing"
            );
            self.report.normalized_pages.push(index);
        }
        self.pages
            .push(Page::from_parts(page_id, cells, grid, overflow));
        Ok(())
    }

    pub(crate) fn finish(
        self,
        page_size: PageSize,
        flags: ManifestFlags,
    ) -> Result<(Document, DecodeReport), ArchiveError> {
        if self.pages.is_empty() {
            return Err(ArchiveError::MalformedManifest(
                "document has no pages".to_string(),
            ));
        }
        let document = Document::from_parts(page_size, self.pages, flags.display(), flags.title);
        Ok((document, self.report))
    }
}

/// Write `doc` as a container file.
pub fn save(doc: &Document, path: impl AsRef<Path>) -> Result<(), ArchiveError> {
    let path = path.as_ref();
    let bytes = encode(doc)?;
    std::fs::write(path, bytes)?;
    debug!(path = %path.display(), "saved layout");
    Ok(())
}

/// True when `path` names the legacy inline-payload form.
pub fn is_legacy_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(LEGACY_EXTENSION))
}

/// Load a layout file, choosing the form by extension: `.json` is the legacy
/// form, anything else is a container.
pub fn open(path: impl AsRef<Path>) -> Result<Loaded, ArchiveError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let loaded = if is_legacy_path(path) {
        decode_legacy(&bytes)?
    } else {
        decode(&bytes)?
    };
    debug!(
        path = %path.display(),
        pages = loaded.document.page_count(),
        missing = loaded.report.missing.len(),
        "opened layout"
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageSize;

    fn content(name: &str, bytes: &[u8]) -> CellContent {
        CellContent::new(
            name,
            format!("/src/{name}"),
            ImageData::new(MediaType::Png, bytes.to_vec()),
        )
    }

    fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        zip.file_names().map(str::to_string).collect()
    }

    fn manifest_json(bytes: &[u8]) -> serde_json::Value {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut buf = String::new();
        zip.by_name(MANIFEST_ENTRY)
            .unwrap()
            .read_to_string(&mut buf)
            .unwrap();
        serde_json::from_str(&buf).unwrap()
    }

    #[test]
    fn identical_payloads_stored_once() {
        let mut doc = Document::new();
        doc.place_contents([content("a.png", b"same"), content("b.png", b"same")]);
        let bytes = encode(&doc).unwrap();

        let images: Vec<_> = entry_names(&bytes)
            .into_iter()
            .filter(|n| n.starts_with(IMAGE_DIR))
            .collect();
        assert_eq!(images, vec!["images/image_0.png".to_string()]);

        let m = manifest_json(&bytes);
        let cells = &m["pages"][0]["cells"];
        assert_eq!(cells[0]["content"]["imageRef"], "image_0.png");
        assert_eq!(cells[1]["content"]["imageRef"], "image_0.png");
        assert_eq!(cells[0]["content"]["filename"], "a.png");
        assert_eq!(cells[1]["content"]["filename"], "b.png");

        let loaded = decode(&bytes).unwrap();
        let cells = loaded.document.pages()[0].cells();
        let (a, b) = (cells[0].content().unwrap(), cells[1].content().unwrap());
        assert_eq!((a.filename.as_str(), b.filename.as_str()), ("a.png", "b.png"));
        assert_eq!(a.image.as_ref().unwrap().bytes(), &Bytes::from_static(b"same"));
        assert!(a.is_identical(b));
    }

    #[test]
    fn refs_count_in_walk_order_with_extensions() {
        let mut doc = Document::new();
        doc.set_page_grid(0, 1, 2).unwrap();
        doc.place_contents([
            content("first.png", b"1"),
            CellContent::new("v.svg", "", ImageData::new(MediaType::Svg, b"2".to_vec())),
        ]);
        // The svg is parked in page 0's overflow.
        doc.set_page_grid(0, 1, 1).unwrap();
        doc.add_page();
        let jpeg = CellContent::new("j.jpg", "", ImageData::new(MediaType::Jpeg, b"3".to_vec()));
        doc.page_mut(1)
            .unwrap()
            .set_cell_content(0, Some(jpeg))
            .unwrap();

        let bytes = encode(&doc).unwrap();
        let m = manifest_json(&bytes);
        assert_eq!(m["pages"][0]["cells"][0]["content"]["imageRef"], "image_0.png");
        assert_eq!(m["pages"][0]["hiddenContent"][0]["imageRef"], "image_1.svg");
        assert_eq!(m["pages"][1]["cells"][0]["content"]["imageRef"], "image_2.jpg");
        assert_eq!(entry_names(&bytes).len(), 4);
    }

    #[test]
    fn full_round_trip_preserves_structure() {
        let mut doc = Document::new();
        doc.set_page_size(PageSize::A3).unwrap();
        doc.set_title("Sheet");
        doc.flags.show_page_numbers = true;
        doc.flags.show_filenames = false;
        doc.place_contents((0..6u8).map(|n| content(&format!("{n}.png"), &[n])));
        doc.set_page_grid(0, 1, 2).unwrap();

        let loaded = decode(&encode(&doc).unwrap()).unwrap();
        assert!(loaded.report.is_clean());
        assert_eq!(loaded.document, doc);
    }

    #[test]
    fn missing_manifest_is_format_error() {
        let bytes = zip_with(&[("images/image_0.png", b"x")]);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingManifest(MANIFEST_ENTRY)));
        assert!(err.is_format_error());
    }

    #[test]
    fn not_a_zip() {
        let err = decode(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidContainer(_)));
    }

    #[test]
    fn malformed_manifest() {
        let bytes = zip_with(&[(MANIFEST_ENTRY, br#"{"pageSize":"A5","pages":[]}"#)]);
        assert!(matches!(
            decode(&bytes),
            Err(ArchiveError::MalformedManifest(_))
        ));
        let bytes = zip_with(&[(MANIFEST_ENTRY, br#"{"pageSize":"A4","pages":[]}"#)]);
        assert!(matches!(
            decode(&bytes),
            Err(ArchiveError::MalformedManifest(_))
        ));
    }

    #[test]
    fn missing_image_keeps_metadata() {
        let manifest = br#"{
            "pageSize": "A4",
            "pages": [{
                "id": "p1",
                "cells": [
                    {"id": "c1", "content": {"filename": "kept.png", "originalPath": "/k.png", "imageRef": "image_0.png"}},
                    {"id": "c2", "content": {"filename": "lost.png", "originalPath": "/l.png", "imageRef": "image_9.png"}}
                ],
                "gridSettings": {"rows": 1, "cols": 2, "gap": 5, "margin": 10}
            }]
        }"#;
        let bytes = zip_with(&[(MANIFEST_ENTRY, manifest), ("images/image_0.png", b"png")]);
        let loaded = decode(&bytes).unwrap();
        let cells = loaded.document.pages()[0].cells();
        assert!(cells[0].content().unwrap().image.is_some());
        let lost = cells[1].content().unwrap();
        assert_eq!(lost.filename, "lost.png");
        assert!(lost.image.is_none());
        assert_eq!(
            loaded.report.missing,
            vec![MissingImage {
                page: 0,
                filename: "lost.png".into(),
                reference: Some("image_9.png".into()),
            }]
        );
        assert_eq!(cells[0].id().as_str(), "c1");
    }

    #[test]
    fn media_type_from_ref_extension() {
        let manifest = br#"{"pageSize":"A4","pages":[{"id":"p","cells":[
            {"id":"c","content":{"filename":"x","imageRef":"image_0.svg"}}],
            "gridSettings":{"rows":1,"cols":1,"gap":0,"margin":0}}]}"#;
        let bytes = zip_with(&[(MANIFEST_ENTRY, manifest), ("images/image_0.svg", b"<svg/>")]);
        let loaded = decode(&bytes).unwrap();
        let image = loaded.document.pages()[0].cells()[0]
            .content()
            .unwrap()
            .image
            .clone()
            .unwrap();
        assert_eq!(image.media_type(), &MediaType::Svg);
    }

    #[test]
    fn unknown_media_type_survives_round_trip() {
        let mut doc = Document::new();
        doc.place_contents([CellContent::new(
            "scan.bmp",
            "/src/scan.bmp",
            ImageData::new(MediaType::Other("image/bmp".into()), vec![b'B', b'M', 0, 1]),
        )]);
        let bytes = encode(&doc).unwrap();
        let json = manifest_json(&bytes);
        assert_eq!(json["pages"][0]["cells"][0]["content"]["mediaType"], "image/bmp");

        let loaded = decode(&bytes).unwrap();
        assert_eq!(loaded.document, doc);
    }

    #[test]
    fn known_media_type_not_written() {
        let mut doc = Document::new();
        doc.place_contents([content("a.png", b"a")]);
        let json = manifest_json(&encode(&doc).unwrap());
        assert!(json["pages"][0]["cells"][0]["content"].get("mediaType").is_none());
    }

    #[test]
    fn oversized_grid_in_manifest_rejected() {
        let manifest = br#"{"pageSize":"A4","pages":[{"id":"p","cells":[],
            "gridSettings":{"rows":200000,"cols":200000,"gap":0,"margin":0}}]}"#;
        let err = decode(&zip_with(&[(MANIFEST_ENTRY, manifest)])).unwrap_err();
        assert!(matches!(err, ArchiveError::MalformedManifest(_)), "{err:?}");
    }

    /// Overwrite the uncompressed size recorded for `name` in both the local
    /// header and the central directory.
    fn declare_size(zip: &mut [u8], name: &str, size: u32) {
        let name = name.as_bytes();
        // (signature, size offset, name length offset, name offset)
        let headers = [
            ([0x50, 0x4b, 0x03, 0x04], 22, 26, 30),
            ([0x50, 0x4b, 0x01, 0x02], 24, 28, 46),
        ];
        let mut patched = 0;
        for (sig, size_at, len_at, name_at) in headers {
            for i in 0..zip.len().saturating_sub(name_at + name.len()) {
                if zip[i..i + 4] != sig {
                    continue;
                }
                let len = u16::from_le_bytes([zip[i + len_at], zip[i + len_at + 1]]) as usize;
                if zip.get(i + name_at..i + name_at + len) == Some(name) {
                    zip[i + size_at..i + size_at + 4].copy_from_slice(&size.to_le_bytes());
                    patched += 1;
                }
            }
        }
        assert_eq!(patched, 2);
    }

    #[test]
    fn declared_entry_size_does_not_drive_allocation() {
        let mut doc = Document::new();
        doc.place_contents([content("a.png", b"four")]);
        let mut bytes = encode(&doc).unwrap();
        declare_size(&mut bytes, "images/image_0.png", u32::MAX - 1);

        // The forged size may be trusted or rejected; either way the load
        // finishes with the content in place.
        let loaded = decode(&bytes).unwrap();
        assert_eq!(loaded.document.content_count(), 1);
    }

    #[test]
    fn short_cell_list_is_normalized() {
        let manifest = br#"{"pageSize":"A4","pages":[{"id":"p","cells":[
            {"id":"c","content":{"filename":"x","imageRef":null}}],
            "gridSettings":{"rows":2,"cols":2,"gap":0,"margin":0}}]}"#;
        let loaded = decode(&zip_with(&[(MANIFEST_ENTRY, manifest)])).unwrap();
        let page = &loaded.document.pages()[0];
        assert_eq!(page.capacity(), 4);
        assert_eq!(page.content_count(), 1);
        assert_eq!(loaded.report.normalized_pages, vec![0]);
        assert!(loaded.document.is_consistent());
    }

    #[test]
    fn duplicate_cell_ids_replaced() {
        let manifest = br#"{"pageSize":"A4","pages":[{"id":"p","cells":[
            {"id":"dup","content":null},{"id":"dup","content":null}],
            "gridSettings":{"rows":1,"cols":2,"gap":0,"margin":0}}]}"#;
        let loaded = decode(&zip_with(&[(MANIFEST_ENTRY, manifest)])).unwrap();
        assert!(loaded.document.is_consistent());
        assert_eq!(loaded.document.pages()[0].cells()[0].id().as_str(), "dup");
    }

    #[test]
    fn open_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = Document::new();
        doc.place_contents([content("a.png", b"a")]);

        let path = dir.path().join("layout.tlp");
        save(&doc, &path).unwrap();
        assert_eq!(open(&path).unwrap().document, doc);

        let legacy = dir.path().join("old.JSON");
        std::fs::write(&legacy, r#"{"pages":[{"cells":[]}]}"#).unwrap();
        assert!(is_legacy_path(&legacy));
        assert_eq!(open(&legacy).unwrap().document.page_count(), 1);
    }
}

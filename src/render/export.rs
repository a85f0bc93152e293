//! Paginated export.
//!
//! One output page per document page, at the page's true point size with no
//! stream-level margin. PNG, JPEG and SVG payloads are embedded as encoded
//! bytes (SVG stays vector). Anything else leaves its cell blank and is
//! listed in the [`ExportReport`]; that is a capability gap of the output,
//! not an error.
//!
//! A geometry failure stops the export at that page. Pages already handed to
//! the target stay there.

use tracing::{debug, warn};

use super::{ImageSource, PageTarget, paint_page};
use crate::document::Document;
use crate::error::RenderError;
use crate::media::MediaType;
use crate::plan::{ImageSlot, plan_page};

/// Why a cell's image was left out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The output cannot embed this media type.
    Unsupported(MediaType),
    /// The payload's dimensions could not be read.
    Unreadable(String),
    /// The content has no payload.
    Missing,
    /// The cell has no space left for the image under its caption.
    NoRoom,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedImage {
    pub page: usize,
    pub cell: usize,
    pub filename: String,
    pub reason: SkipReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub pages: usize,
    pub skipped: Vec<SkippedImage>,
}

/// Media types the export embeds.
pub fn is_embeddable(media_type: &MediaType) -> bool {
    matches!(media_type, MediaType::Png | MediaType::Jpeg | MediaType::Svg)
}

/// Write every page of `doc` to `target`.
pub fn export<T: PageTarget + ?Sized>(
    doc: &Document,
    target: &mut T,
) -> Result<ExportReport, RenderError> {
    let mut report = ExportReport::default();
    for index in 0..doc.page_count() {
        let plan = plan_page(doc, index)?;
        target.begin_page(plan.page_size);
        paint_page(&plan, target, |surface, cell, slot| {
            let reason = match slot {
                ImageSlot::Placed { data, rect } => {
                    if is_embeddable(data.media_type()) {
                        surface.draw_image(*rect, ImageSource::Encoded(*data));
                        return;
                    }
                    SkipReason::Unsupported(data.media_type().clone())
                }
                ImageSlot::Unreadable { reason, .. } => SkipReason::Unreadable(reason.clone()),
                ImageSlot::Missing => SkipReason::Missing,
                ImageSlot::NoRoom { .. } => SkipReason::NoRoom,
            };
            let filename = cell
                .filled
                .as_ref()
                .map(|f| f.content.filename.clone())
                .unwrap_or_default();
            warn!(page = index, cell = cell.index, %filename, ?reason, "image left out of export");
            report.skipped.push(SkippedImage {
                page: index,
                cell: cell.index,
                filename,
                reason,
            });
        });
        target.end_page();
        report.pages += 1;
    }
    debug!(
        pages = report.pages,
        skipped = report.skipped.len(),
        "exported document"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::CellContent;
    use crate::geometry::{GridSettings, PageSize};
    use crate::media::ImageData;
    use crate::render::{DisplayList, DrawOp, RecordedImage};
    use std::io::Cursor;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="20"/>"#;

    fn png(width: u32, height: u32) -> ImageData {
        let img = image::RgbaImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        ImageData::new(MediaType::Png, out.into_inner())
    }

    fn gif(width: u32, height: u32) -> ImageData {
        let img = image::RgbaImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Gif)
            .unwrap();
        ImageData::new(MediaType::Gif, out.into_inner())
    }

    fn images(list: &DisplayList, page: usize) -> Vec<&RecordedImage> {
        list.pages[page]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { image, .. } => Some(image),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn one_page_per_document_page_at_true_size() {
        let mut doc = Document::new();
        doc.add_page();
        doc.add_page();
        doc.set_page_size(PageSize::A3).unwrap();
        let mut list = DisplayList::new();
        let report = export(&doc, &mut list).unwrap();
        assert_eq!(report.pages, 3);
        assert_eq!(list.pages.len(), 3);
        assert!(list.pages.iter().all(|p| p.size == PageSize::A3.size_pt()));
    }

    #[test]
    fn vector_payload_embedded_not_rasterized() {
        let mut doc = Document::new();
        doc.place_contents([
            CellContent::new("v.svg", "", ImageData::new(MediaType::Svg, SVG.as_bytes().to_vec())),
            CellContent::new("r.png", "", png(4, 2)),
        ]);
        let mut list = DisplayList::new();
        let report = export(&doc, &mut list).unwrap();
        assert!(report.skipped.is_empty());
        let imgs = images(&list, 0);
        assert_eq!(imgs.len(), 2);
        assert!(matches!(imgs[0], RecordedImage::Encoded(d) if d.media_type().is_vector()));
        assert!(matches!(imgs[1], RecordedImage::Encoded(d) if d.media_type() == &MediaType::Png));
    }

    #[test]
    fn unsupported_type_left_blank_and_reported() {
        let mut doc = Document::new();
        doc.place_contents([
            CellContent::new("anim.gif", "", gif(2, 2)),
            CellContent::unresolved("gone.png", ""),
        ]);
        let mut list = DisplayList::new();
        let report = export(&doc, &mut list).unwrap();
        assert!(images(&list, 0).is_empty());
        assert_eq!(
            report.skipped,
            vec![
                SkippedImage {
                    page: 0,
                    cell: 0,
                    filename: "anim.gif".into(),
                    reason: SkipReason::Unsupported(MediaType::Gif),
                },
                SkippedImage {
                    page: 0,
                    cell: 1,
                    filename: "gone.png".into(),
                    reason: SkipReason::Missing,
                },
            ]
        );
        // Captions still drawn for both.
        assert!(list.texts().any(|t| t == "anim.gif"));
        assert!(list.texts().any(|t| t == "gone.png"));
    }

    #[test]
    fn cramped_cells_export_caption_only() {
        let mut doc = Document::new();
        doc.set_grid_settings(0, GridSettings::new(80, 1, 0.0, 0.0)).unwrap();
        doc.place_contents([CellContent::new("tall.png", "", png(2, 2))]);
        let mut list = DisplayList::new();
        let report = export(&doc, &mut list).unwrap();
        assert_eq!(report.pages, 1);
        assert!(images(&list, 0).is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::NoRoom);
        assert!(list.texts().any(|t| t == "tall.png"));
    }

    #[test]
    fn geometry_failure_stops_at_that_page() {
        let mut doc = Document::new();
        doc.add_page();
        // Out-of-band grid: stored directly, as a decoded file could carry it.
        doc.page_mut(1).unwrap().grid = GridSettings::new(2, 2, 5.0, 150.0);
        let mut list = DisplayList::new();
        let err = export(&doc, &mut list).unwrap_err();
        assert!(matches!(err, RenderError::Geometry { page: 1, .. }));
        assert_eq!(list.pages.len(), 1);
    }
}

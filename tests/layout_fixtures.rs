//! End-to-end fixtures: known page sizes, known grids, known edits.
//!
//! Each test drives the public API the way a host application would and
//! checks the result against hand-computed values.

use std::io::{Cursor, Write};

use tilelayout::geometry::{caption_split, cell_rects, image_fit_rect, mm_to_pt};
use tilelayout::*;

const EPS: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

fn png(width: u32, height: u32) -> ImageData {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    ImageData::new(MediaType::Png, out.into_inner())
}

fn item(name: &str, data: ImageData) -> CellContent {
    CellContent::new(name, format!("/photos/{name}"), data)
}

fn names(page: &Page) -> Vec<Option<String>> {
    page.cells()
        .iter()
        .map(|c| c.content().map(|c| c.filename.clone()))
        .collect()
}

// ── geometry ──

#[test]
fn a4_and_a3_in_points() {
    let a4 = PageSize::A4.size_pt();
    assert!((a4.width - 595.2756).abs() < 1e-3);
    assert!((a4.height - 841.8898).abs() < 1e-3);
    let a3 = PageSize::A3.size_pt();
    assert!((a3.width - 841.8898).abs() < 1e-3);
    assert!((a3.height - 1190.5512).abs() < 1e-3);
}

#[test]
fn widths_and_gaps_sum_to_page() {
    for page_size in [PageSize::A4, PageSize::A3] {
        for (rows, cols, gap, margin) in [(1, 1, 0.0, 0.0), (2, 2, 5.0, 10.0), (4, 3, 2.5, 15.0)] {
            let grid = GridSettings::new(rows, cols, gap, margin);
            let m = GridMetrics::compute(page_size, &grid).unwrap();
            let page = page_size.size_pt();
            let across = 2.0 * mm_to_pt(margin)
                + cols as f64 * m.cell_width
                + (cols - 1) as f64 * mm_to_pt(gap);
            let down = 2.0 * mm_to_pt(margin)
                + rows as f64 * m.cell_height
                + (rows - 1) as f64 * mm_to_pt(gap);
            assert!((across - page.width).abs() < 1e-6, "{grid:?}");
            assert!((down - page.height).abs() < 1e-6, "{grid:?}");
        }
    }
}

#[test]
fn default_grid_cells() {
    let rects = cell_rects(PageSize::A4, &GridSettings::default()).unwrap();
    let margin = mm_to_pt(10.0);
    let gap = mm_to_pt(5.0);
    let page = PageSize::A4.size_pt();
    let w = (page.width - 2.0 * margin - gap) / 2.0;
    let h = (page.height - 2.0 * margin - gap) / 2.0;
    assert_eq!(rects.len(), 4);
    assert_eq!(rects[0], Rect::new(margin, margin, w, h));
    assert!(close(rects[1].x, margin + w + gap));
    assert!(close(rects[2].y, margin + h + gap));
    assert!(close(rects[3].right(), page.width - margin));
}

#[test]
fn margins_that_leave_no_room_are_rejected() {
    let grid = GridSettings::new(1, 1, 0.0, 105.0);
    assert!(GridMetrics::compute(PageSize::A4, &grid).is_err());
    assert!(GridMetrics::compute(PageSize::A3, &grid).is_ok());
    assert!(GridMetrics::compute(PageSize::A4, &GridSettings::new(0, 3, 5.0, 10.0)).is_err());
}

#[test]
fn image_fit_fixtures() {
    let cell = Rect::new(10.0, 20.0, 200.0, 100.0);
    // Wide image: touches left and right.
    let wide = image_fit_rect(cell, 4.0).unwrap();
    assert_eq!(wide, Rect::new(10.0, 45.0, 200.0, 50.0));
    // Tall image: touches top and bottom.
    let tall = image_fit_rect(cell, 0.5).unwrap();
    assert_eq!(tall, Rect::new(85.0, 20.0, 50.0, 100.0));
    // Same aspect fills exactly.
    assert_eq!(image_fit_rect(cell, 2.0).unwrap(), cell);
    assert!(image_fit_rect(cell, 0.0).is_err());
}

#[test]
fn caption_strip_comes_off_the_bottom() {
    let cell = Rect::new(0.0, 0.0, 100.0, 100.0);
    let (area, strip) = caption_split(cell, true);
    assert_eq!(area, Rect::new(0.0, 0.0, 100.0, 88.0));
    assert_eq!(strip, Some(Rect::new(0.0, 88.0, 100.0, 12.0)));
    assert_eq!(caption_split(cell, false), (cell, None));
}

// ── reflow ──

#[test]
fn shrink_then_grow_restores_order() {
    let mut doc = Document::new();
    doc.place_contents((0..4).map(|n| item(&format!("{n}.png"), png(2, 2))));
    let ids_before: Vec<_> = doc.pages()[0].cells().iter().map(|c| c.id().clone()).collect();

    doc.set_page_grid(0, 1, 2).unwrap();
    assert_eq!(
        names(&doc.pages()[0]),
        vec![Some("0.png".into()), Some("1.png".into())]
    );
    let parked: Vec<_> = doc.pages()[0].overflow().iter().map(|c| c.filename.as_str()).collect();
    assert_eq!(parked, ["2.png", "3.png"]);

    doc.set_page_grid(0, 3, 2).unwrap();
    assert_eq!(
        names(&doc.pages()[0]),
        vec![
            Some("0.png".into()),
            Some("1.png".into()),
            Some("2.png".into()),
            Some("3.png".into()),
            None,
            None,
        ]
    );
    assert!(doc.pages()[0].overflow().is_empty());
    // Reflow issues fresh cell ids.
    assert!(
        doc.pages()[0]
            .cells()
            .iter()
            .all(|c| !ids_before.contains(c.id()))
    );
    assert!(doc.is_consistent());
}

#[test]
fn gaps_are_compacted_on_reflow() {
    let mut doc = Document::new();
    let page = doc.page_mut(0).unwrap();
    page.set_cell_content(1, Some(item("a.png", png(1, 1)))).unwrap();
    page.set_cell_content(3, Some(item("b.png", png(1, 1)))).unwrap();
    doc.set_page_grid(0, 1, 3).unwrap();
    assert_eq!(
        names(&doc.pages()[0]),
        vec![Some("a.png".into()), Some("b.png".into()), None]
    );
}

#[test]
fn move_is_its_own_inverse() {
    let mut doc = Document::new();
    doc.place_contents([item("a.png", png(1, 1)), item("b.png", png(1, 1))]);
    let before = doc.clone();
    let page = doc.page_mut(0).unwrap();
    page.move_cell(0, 3).unwrap();
    assert_ne!(doc, before);
    doc.page_mut(0).unwrap().move_cell(0, 3).unwrap();
    assert_eq!(doc, before);
}

#[test]
fn rejected_grid_leaves_page_alone() {
    let mut doc = Document::new();
    doc.place_contents([item("a.png", png(1, 1))]);
    let before = doc.clone();
    assert!(doc.set_page_grid(0, 0, 2).is_err());
    assert!(
        doc.set_grid_settings(0, GridSettings::new(2, 2, 5.0, 200.0))
            .is_err()
    );
    assert!(doc.set_page_grid(5, 1, 1).is_err());
    assert_eq!(doc, before);
}

// ── archive ──

#[test]
fn shared_payload_stored_once_and_round_trips() {
    let shared = png(3, 2);
    let mut doc = Document::new();
    doc.set_title("Trip");
    doc.flags.show_page_numbers = true;
    doc.place_contents([
        item("one.png", shared.clone()),
        item("two.png", png(5, 5)),
        item("copy.png", shared),
    ]);
    doc.set_page_grid(0, 1, 1).unwrap();

    let bytes = encode(&doc).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
    let images = (0..zip.len())
        .filter(|&i| zip.by_index(i).unwrap().name().starts_with("images/"))
        .count();
    assert_eq!(images, 2);

    let loaded = decode(&bytes).unwrap();
    assert!(loaded.report.is_clean());
    assert_eq!(loaded.document, doc);
    assert_eq!(loaded.document.pages()[0].overflow().len(), 2);
}

#[test]
fn missing_manifest_keeps_current_document() {
    let mut current = Document::new();
    current.set_title("Keep me");
    let snapshot = current.clone();

    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        zip.start_file("images/image_0.png", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(png(1, 1).bytes()).unwrap();
        zip.finish().unwrap();
    }

    match decode(buf.get_ref()) {
        Ok(loaded) => current = loaded.document,
        Err(err) => assert!(matches!(err, ArchiveError::MissingManifest(_))),
    }
    assert_eq!(current, snapshot);
}

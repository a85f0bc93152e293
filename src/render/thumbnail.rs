//! First-page thumbnail.
//!
//! The page is scaled uniformly to fit a caller-supplied box. Output
//! dimensions are whole units, so the drawn page keeps the page's aspect to
//! within one unit. Vector payloads are rasterized at their on-thumbnail
//! pixel size so they stay sharp; raster payloads are passed through encoded.

use num_traits::clamp;
use tracing::{debug, warn};

use super::{ImageSource, PageTarget, Surface, Transformed, paint_page};
use crate::document::Document;
use crate::error::RenderError;
use crate::geometry::{Rect, Size};
use crate::media::rasterize_vector;
use crate::plan::{ImageSlot, plan_page};

/// Largest edge, in pixels, a vector payload is rasterized to.
pub const MAX_RASTER_EDGE: f64 = 4096.0;

/// Placement of the page inside the requested box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Thumbnail {
    /// Output size, whole units.
    pub size: Size,
    /// Page points to output units.
    pub scale: f64,
}

/// Fit a page of `page` points into `bounds`.
pub fn fit(page: Size, bounds: Size) -> Result<Thumbnail, RenderError> {
    let empty = RenderError::EmptyTarget {
        width: bounds.width,
        height: bounds.height,
    };
    if !(bounds.width.is_finite() && bounds.height.is_finite()) {
        return Err(empty);
    }
    let scale = page.fit_scale(bounds);
    let size = Size::new(whole(page.width * scale), whole(page.height * scale));
    if !(size.width >= 1.0 && size.height >= 1.0) {
        return Err(empty);
    }
    Ok(Thumbnail { size, scale })
}

/// Round down, forgiving float noise just under a whole number.
fn whole(v: f64) -> f64 {
    (v + 1e-9).floor()
}

/// Pixel size for rasterizing into `px`. Both edges shrink by the same
/// factor when the longer one exceeds [`MAX_RASTER_EDGE`].
fn raster_size(px: Rect) -> (u32, u32) {
    let longest = px.width.max(px.height);
    let shrink = if longest > MAX_RASTER_EDGE { MAX_RASTER_EDGE / longest } else { 1.0 };
    let edge = |v: f64| clamp((v * shrink).round(), 1.0, MAX_RASTER_EDGE) as u32;
    (edge(px.width), edge(px.height))
}

/// Draw the first page of `doc` into one page of `target`, sized to fit
/// `bounds`.
pub fn render_thumbnail<T: PageTarget + ?Sized>(
    doc: &Document,
    bounds: Size,
    target: &mut T,
) -> Result<Thumbnail, RenderError> {
    let plan = plan_page(doc, 0)?;
    let thumb = fit(plan.page_size, bounds)?;

    target.begin_page(thumb.size);
    let mut view = Transformed::new(target, thumb.scale, 0.0, 0.0);
    paint_page(&plan, &mut view, |surface, cell, slot| {
        let ImageSlot::Placed { data, rect } = slot else {
            return;
        };
        if !data.media_type().is_vector() {
            surface.draw_image(*rect, ImageSource::Encoded(*data));
            return;
        }
        let (width, height) = raster_size(surface.map(*rect));
        match rasterize_vector(data, width, height) {
            Ok(raster) => surface.draw_image(*rect, ImageSource::Pixels(&raster)),
            Err(err) => warn!(cell = cell.index, %err, "could not rasterize vector image"),
        }
    });
    target.end_page();

    debug!(
        width = thumb.size.width,
        height = thumb.size.height,
        scale = thumb.scale,
        "rendered thumbnail"
    );
    Ok(thumb)
}

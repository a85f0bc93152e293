//! Image payloads: media types, intrinsic sizes, and vector rasterization.

use std::io::Cursor;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use resvg::{tiny_skia, usvg};

use crate::error::MediaError;
use crate::geometry::Size;

/// Declared media type of an image payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MediaType {
    Png,
    Jpeg,
    Gif,
    Webp,
    Svg,
    /// Anything else, keeping the declared MIME string.
    Other(String),
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Self {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/gif" => Self::Gif,
            "image/webp" => Self::Webp,
            "image/svg+xml" => Self::Svg,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn mime(&self) -> &str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Svg => "image/svg+xml",
            Self::Other(mime) => mime,
        }
    }

    /// File extension used for stored payloads. Unknown types store as `png`.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png | Self::Other(_) => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Svg => "svg",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Guess from the payload's leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if let Ok(format) = image::guess_format(bytes) {
            return match format {
                image::ImageFormat::Png => Some(Self::Png),
                image::ImageFormat::Jpeg => Some(Self::Jpeg),
                image::ImageFormat::Gif => Some(Self::Gif),
                image::ImageFormat::WebP => Some(Self::Webp),
                _ => None,
            };
        }
        looks_like_svg(bytes).then_some(Self::Svg)
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Svg)
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

/// An image payload. Cloning shares the bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    media_type: MediaType,
    bytes: Bytes,
}

impl ImageData {
    pub fn new(media_type: MediaType, bytes: impl Into<Bytes>) -> Self {
        Self {
            media_type,
            bytes: bytes.into(),
        }
    }

    /// Build from bytes alone, sniffing the media type.
    pub fn sniffed(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let media_type = MediaType::sniff(&bytes)
            .unwrap_or_else(|| MediaType::Other("application/octet-stream".to_string()));
        Self { media_type, bytes }
    }

    /// Parse `data:<mime>;base64,<payload>`.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        let media_type = if mime.is_empty() {
            MediaType::sniff(&bytes)?
        } else {
            MediaType::from_mime(mime)
        };
        Some(Self::new(media_type, bytes))
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type.mime(),
            STANDARD.encode(&self.bytes)
        )
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Byte-equal payloads are the same image regardless of media type label.
    pub fn same_payload(&self, other: &ImageData) -> bool {
        self.bytes == other.bytes
    }

    /// Natural width and height (pixels for raster, user units for SVG).
    pub fn intrinsic_size(&self) -> Result<Size, MediaError> {
        let size = if self.media_type.is_vector() {
            let tree = parse_svg(&self.bytes)?;
            let s = tree.size();
            Size::new(s.width() as f64, s.height() as f64)
        } else {
            let (w, h) = image::ImageReader::new(Cursor::new(self.bytes.as_ref()))
                .with_guessed_format()
                .map_err(|e| MediaError::Decode(image::ImageError::IoError(e)))?
                .into_dimensions()?;
            Size::new(w as f64, h as f64)
        };
        if !(size.width > 0.0 && size.height > 0.0) {
            return Err(MediaError::ZeroSize);
        }
        Ok(size)
    }

    pub fn aspect_ratio(&self) -> Result<f64, MediaError> {
        Ok(self.intrinsic_size()?.aspect())
    }
}

fn parse_svg(bytes: &[u8]) -> Result<usvg::Tree, MediaError> {
    usvg::Tree::from_data(bytes, &usvg::Options::default()).map_err(|e| MediaError::Svg(e.to_string()))
}

/// Straight (non-premultiplied) RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl RasterImage {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }

    pub fn to_png(&self) -> Result<Vec<u8>, MediaError> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .ok_or(MediaError::RasterTarget {
                width: self.width,
                height: self.height,
            })?;
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(buffer).write_to(&mut out, image::ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

/// Render a vector payload to exactly `width` × `height` pixels.
pub fn rasterize_vector(data: &ImageData, width: u32, height: u32) -> Result<RasterImage, MediaError> {
    if !data.media_type().is_vector() {
        return Err(MediaError::Unsupported(data.media_type().mime().to_string()));
    }
    let tree = parse_svg(data.bytes())?;
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(MediaError::RasterTarget { width, height })?;

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let rgba = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    Ok(RasterImage {
        width,
        height,
        rgba,
    })
}

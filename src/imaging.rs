//! Pure-Rust thumbnail rendering for the builtin preview backend.
//!
//! Zero external dependencies: decoding and encoding go through the `image`
//! crate and are statically linked into the binary. This is what makes the
//! `builtin` backend portable — no QuickLook, no ImageMagick, no `apt
//! install`.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Downscale | `DynamicImage::resize` with `Lanczos3` filter |
//! | Encode → PNG | `DynamicImage::save` (format from the `.png` extension) |
//!
//! File types outside the decoder set produce no artifact, which the preview
//! cache records as a known-unsupported outcome — exactly like an external
//! generator that declines a file.

use image::ImageReader;
use image::imageops::FilterType;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decoding failed: {0}")]
    Decode(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Extensions whose decoders are compiled in and known to work.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

/// Can the builtin backend decode this file, judged by extension?
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

/// Render a PNG thumbnail of `source` at `dest`, at most `max_edge` pixels
/// on the longer edge. Images already smaller than `max_edge` are copied
/// through at their own size rather than upscaled.
pub fn render_thumbnail(source: &Path, dest: &Path, max_edge: u32) -> Result<(), ImagingError> {
    let img = ImageReader::open(source)?
        .decode()
        .map_err(|e| ImagingError::Decode(format!("{}: {}", source.display(), e)))?;

    let thumb = if img.width() > max_edge || img.height() > max_edge {
        img.resize(max_edge, max_edge, FilterType::Lanczos3)
    } else {
        img
    };

    thumb
        .save(dest)
        .map_err(|e| ImagingError::Encode(format!("{}: {}", dest.display(), e)))
}

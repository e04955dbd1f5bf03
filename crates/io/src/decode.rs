//! Image decode service: encoded bytes to a row-major RGBA raster.

use particle_morph_core::{DecodedImage, ImageLoadResult, MorphError};
use std::path::Path;

/// Decodes PNG or JPEG bytes.
///
/// Returns `MorphError::Decode` for malformed or unsupported input.
pub fn decode_image(bytes: &[u8]) -> ImageLoadResult {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| MorphError::Decode(e.to_string()))?
        .to_rgba8();
    let (w, h) = rgba.dimensions();
    let w = usize::try_from(w).map_err(|_| MorphError::InvalidDimensions)?;
    let h = usize::try_from(h).map_err(|_| MorphError::InvalidDimensions)?;
    DecodedImage::new(w, h, rgba.into_raw())
}

/// Reads and decodes an image file. Read failures are `MorphError::Io`.
pub fn read_image(path: &Path) -> ImageLoadResult {
    let bytes = std::fs::read(path)
        .map_err(|e| MorphError::Io(format!("{}: {e}", path.display())))?;
    decode_image(&bytes)
}

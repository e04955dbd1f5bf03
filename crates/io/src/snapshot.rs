//! PNG output of a particle frame.
//!
//! Feature-gated behind `png`. The splat itself lives in [`crate::pixel`].

use particle_morph_core::{MorphConfig, MorphError, ParticleBuffer};
use std::path::Path;

use crate::pixel::{splat_to_rgba, Viewport};

/// Splats the buffer's current frame and writes it as a PNG.
///
/// Returns `MorphError::InvalidDimensions` if the viewport overflows `u32`,
/// or `MorphError::Io` on write failure.
pub fn write_png(
    buffer: &ParticleBuffer,
    config: &MorphConfig,
    viewport: &Viewport,
    path: &Path,
) -> Result<(), MorphError> {
    let rgba = splat_to_rgba(&buffer.view(), buffer.render_scales(config), viewport);
    let w = u32::try_from(viewport.width()).map_err(|_| MorphError::InvalidDimensions)?;
    let h = u32::try_from(viewport.height()).map_err(|_| MorphError::InvalidDimensions)?;
    let img = image::RgbaImage::from_raw(w, h, rgba)
        .ok_or_else(|| MorphError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| MorphError::Io(e.to_string()))
}

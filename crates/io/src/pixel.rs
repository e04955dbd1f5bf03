//! Pure-computation splat of a particle frame into an RGBA8 buffer.
//!
//! Stands in for the GPU point renderer: an orthographic view down the -z
//! axis, additive blending on black, each particle a soft round dot whose
//! size and brightness follow its render scales.

use glam::Vec3;
use particle_morph_core::{FrameView, MorphError, RenderScale};

/// Pixels per world unit for a particle of size 1 at the default zoom.
const SIZE_TO_PIXELS: f32 = 40.0;
const MIN_RADIUS_PX: f32 = 0.75;
const FIT_MARGIN: f32 = 1.1;

/// Output raster and the world-space half-height it shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: usize,
    height: usize,
    half_extent: f32,
}

impl Viewport {
    /// Returns `MorphError::InvalidDimensions` for a zero-sized raster or a
    /// non-positive extent.
    pub fn new(width: usize, height: usize, half_extent: f32) -> Result<Self, MorphError> {
        if width == 0 || height == 0 || !half_extent.is_finite() || half_extent <= 0.0 {
            return Err(MorphError::InvalidDimensions);
        }
        Ok(Self {
            width,
            height,
            half_extent,
        })
    }

    /// A viewport just large enough to show every position.
    pub fn fit(width: usize, height: usize, positions: &[Vec3]) -> Result<Self, MorphError> {
        let reach = positions
            .iter()
            .map(|p| p.x.abs().max(p.y.abs()))
            .filter(|r| r.is_finite())
            .fold(0.0_f32, f32::max);
        let half_extent = if reach > 0.0 { reach * FIT_MARGIN } else { 1.0 };
        Self::new(width, height, half_extent)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    fn pixels_per_unit(&self) -> f32 {
        self.height as f32 / (2.0 * self.half_extent)
    }

    /// Pixel-space centre of a world position.
    fn project(&self, p: Vec3) -> (f32, f32) {
        let ppu = self.pixels_per_unit();
        (
            self.width as f32 / 2.0 + p.x * ppu,
            self.height as f32 / 2.0 - p.y * ppu,
        )
    }
}

/// Renders `view` into a `width * height * 4` RGBA8 buffer.
///
/// Particles with zero opacity contribute nothing. Alpha is always 255.
pub fn splat_to_rgba(
    view: &FrameView<'_>,
    scales: impl IntoIterator<Item = RenderScale>,
    viewport: &Viewport,
) -> Vec<u8> {
    let (w, h) = (viewport.width, viewport.height);
    let mut accum = vec![Vec3::ZERO; w * h];
    let zoom = viewport.pixels_per_unit() / SIZE_TO_PIXELS;

    let particles = view
        .positions
        .iter()
        .zip(view.colors)
        .zip(view.sizes)
        .zip(view.opacities)
        .zip(scales);
    for ((((&position, &color), &size), &opacity), scale) in particles {
        if opacity <= 0.0 || !position.is_finite() {
            continue;
        }
        let radius = (size * scale.size * SIZE_TO_PIXELS * zoom).max(MIN_RADIUS_PX);
        let tint = color * scale.brightness * opacity;
        let (cx, cy) = viewport.project(position);

        let x0 = (cx - radius).floor().max(0.0) as usize;
        let y0 = (cy - radius).floor().max(0.0) as usize;
        let x1 = ((cx + radius).ceil().max(0.0) as usize).min(w);
        let y1 = ((cy + radius).ceil().max(0.0) as usize).min(h);
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let falloff = 1.0 - (dx * dx + dy * dy).sqrt() / radius;
                if falloff > 0.0 {
                    accum[y * w + x] += tint * falloff;
                }
            }
        }
    }

    accum
        .iter()
        .flat_map(|c| {
            let c = c.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
            [
                c.x.round() as u8,
                c.y.round() as u8,
                c.z.round() as u8,
                255u8,
            ]
        })
        .collect()
}

//! Image-to-point-cloud sampling.
//!
//! [`ImageSampler::sample`] turns a decoded RGBA raster into exactly `count`
//! target positions and colors. Opaque pixels are mapped to a centred,
//! y-up plane at `z = 0`, then padded with duplicates, reduced to a distinct
//! random subset, or replaced by a synthetic cube, and finally shuffled so
//! that neighbouring pixels do not land on neighbouring particle indices.

use crate::config::MorphConfig;
use crate::error::MorphError;
use crate::prng::Xorshift64;
use glam::Vec3;

/// A decoded raster in row-major RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    width: usize,
    height: usize,
    rgba: Vec<u8>,
}

impl DecodedImage {
    /// Wraps a row-major RGBA buffer.
    ///
    /// A 0×0 image is valid and simply has no opaque pixels. Returns
    /// `MorphError::InvalidDimensions` if `rgba.len() != width * height * 4`.
    pub fn new(width: usize, height: usize, rgba: Vec<u8>) -> Result<Self, MorphError> {
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(4))
            .ok_or(MorphError::InvalidDimensions)?;
        if rgba.len() != expected {
            return Err(MorphError::InvalidDimensions);
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Number of pixels whose alpha is strictly above `alpha_threshold`.
    pub fn opaque_count(&self, alpha_threshold: u8) -> usize {
        self.rgba
            .chunks_exact(4)
            .filter(|px| px[3] > alpha_threshold)
            .count()
    }
}

/// Parallel position/color arrays of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSet {
    positions: Vec<Vec3>,
    colors: Vec<Vec3>,
}

impl TargetSet {
    /// Returns `MorphError::BufferLength` if the arrays differ in length.
    pub fn new(positions: Vec<Vec3>, colors: Vec<Vec3>) -> Result<Self, MorphError> {
        if positions.len() != colors.len() {
            return Err(MorphError::BufferLength {
                expected: positions.len(),
                got: colors.len(),
            });
        }
        Ok(Self { positions, colors })
    }

    /// `count` white points uniformly inside a cube of edge `size`.
    pub fn random_cube(count: usize, size: f32, rng: &mut Xorshift64) -> Self {
        Self {
            positions: (0..count).map(|_| rng.in_cube(size)).collect(),
            colors: vec![Vec3::ONE; count],
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// How the opaque pixel count relates to the requested count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRegime {
    /// No opaque pixels; synthetic points are used.
    Empty,
    /// Fewer opaque pixels than requested; duplicates pad the set.
    Under,
    Exact,
    /// More opaque pixels than requested; a distinct subset is drawn.
    Over,
}

impl SampleRegime {
    pub fn classify(opaque: usize, count: usize) -> Self {
        match opaque {
            0 => SampleRegime::Empty,
            k if k < count => SampleRegime::Under,
            k if k == count => SampleRegime::Exact,
            _ => SampleRegime::Over,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleRegime::Empty => "empty",
            SampleRegime::Under => "under",
            SampleRegime::Exact => "exact",
            SampleRegime::Over => "over",
        }
    }
}

/// Pixel-to-world mapping and fallback settings for sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSampler {
    /// World units per pixel.
    pub scale: f32,
    pub alpha_threshold: u8,
    /// Edge of the synthetic cube used for images with no opaque pixels.
    pub empty_cube_size: f32,
}

impl ImageSampler {
    pub fn from_config(config: &MorphConfig) -> Self {
        Self {
            scale: config.image_scale,
            alpha_threshold: config.alpha_threshold,
            empty_cube_size: config.initial_shape_size * 0.5,
        }
    }

    /// World position and color of every opaque pixel, in raster order.
    pub fn opaque_points(&self, image: &DecodedImage) -> (Vec<Vec3>, Vec<Vec3>) {
        let half_w = image.width as f32 / 2.0;
        let half_h = image.height as f32 / 2.0;
        image
            .rgba
            .chunks_exact(4)
            .enumerate()
            .filter(|(_, px)| px[3] > self.alpha_threshold)
            .map(|(index, px)| {
                let col = (index % image.width) as f32;
                let row = (index / image.width) as f32;
                let position = Vec3::new((col - half_w) * self.scale, (half_h - row) * self.scale, 0.0);
                let color = Vec3::new(px[0] as f32, px[1] as f32, px[2] as f32) / 255.0;
                (position, color)
            })
            .unzip()
    }

    /// Samples exactly `count` targets from `image`.
    ///
    /// Images with no opaque pixels fall back to a synthetic white cube;
    /// use [`ImageSampler::sample_strict`] to treat that as an error instead.
    pub fn sample(&self, image: &DecodedImage, count: usize, rng: &mut Xorshift64) -> TargetSet {
        if count == 0 {
            return TargetSet {
                positions: Vec::new(),
                colors: Vec::new(),
            };
        }
        let (positions, colors) = self.opaque_points(image);
        if positions.is_empty() {
            log::warn!(
                "image {}x{} has no opaque pixels, using {count} synthetic points",
                image.width,
                image.height
            );
            return TargetSet::random_cube(count, self.empty_cube_size, rng);
        }
        self.fit(positions, colors, count, rng)
    }

    /// Like [`ImageSampler::sample`], but returns `MorphError::EmptyImage`
    /// when the image has no opaque pixels.
    pub fn sample_strict(
        &self,
        image: &DecodedImage,
        count: usize,
        rng: &mut Xorshift64,
    ) -> Result<TargetSet, MorphError> {
        if count > 0 && image.opaque_count(self.alpha_threshold) == 0 {
            return Err(MorphError::EmptyImage);
        }
        Ok(self.sample(image, count, rng))
    }

    /// Pads, subsets and shuffles a non-empty opaque set to `count` entries.
    fn fit(
        &self,
        positions: Vec<Vec3>,
        colors: Vec<Vec3>,
        count: usize,
        rng: &mut Xorshift64,
    ) -> TargetSet {
        let opaque = positions.len();
        let mut order: Vec<usize> = (0..opaque).collect();

        match SampleRegime::classify(opaque, count) {
            SampleRegime::Under => {
                while order.len() < count {
                    let pick = order[rng.next_usize(order.len())];
                    order.push(pick);
                }
            }
            SampleRegime::Over => {
                // Partial Fisher-Yates: the first `count` slots end up a
                // uniform distinct subset, with no rejection loop.
                for i in 0..count {
                    let j = i + rng.next_usize(opaque - i);
                    order.swap(i, j);
                }
                order.truncate(count);
            }
            SampleRegime::Exact | SampleRegime::Empty => {}
        }

        rng.shuffle(&mut order);
        log::debug!(
            "sampled {count} targets from {opaque} opaque pixels ({})",
            SampleRegime::classify(opaque, count).name()
        );

        TargetSet {
            positions: order.iter().map(|&i| positions[i]).collect(),
            colors: order.iter().map(|&i| colors[i]).collect(),
        }
    }
}

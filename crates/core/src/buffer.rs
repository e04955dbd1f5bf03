//! Per-particle storage shared by the morph engine, idle driver, opacity fade
//! and the rendering collaborator.
//!
//! All arrays have the same length `N`, fixed at construction. Index `i`
//! names the same particle in every array for the life of the buffer.
//! Wholesale replacement copies into the existing allocation, so slices
//! handed to a renderer earlier in the frame are never reallocated away.

use crate::config::MorphConfig;
use crate::error::MorphError;
use crate::prng::Xorshift64;
use glam::Vec3;

/// Structure-of-arrays particle state.
#[derive(Debug, Clone)]
pub struct ParticleBuffer {
    positions: Vec<Vec3>,
    anchors: Vec<Vec3>,
    targets: Vec<Vec3>,
    colors: Vec<Vec3>,
    sizes: Vec<f32>,
    opacities: Vec<f32>,
    effect_strengths: Vec<f32>,
}

/// Read-only view of the arrays a renderer consumes each frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub positions: &'a [Vec3],
    pub colors: &'a [Vec3],
    pub sizes: &'a [f32],
    pub opacities: &'a [f32],
    pub effect_strengths: &'a [f32],
}

/// Disjoint borrows of the arrays written during a frame.
pub(crate) struct Motion<'a> {
    pub positions: &'a mut [Vec3],
    pub anchors: &'a [Vec3],
    pub targets: &'a [Vec3],
    pub effect_strengths: &'a mut [f32],
    pub opacities: &'a mut [f32],
}

/// Per-particle multipliers derived from effect strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderScale {
    pub size: f32,
    pub brightness: f32,
}

fn copy_into<T: Copy>(dst: &mut [T], src: &[T]) -> Result<(), MorphError> {
    if dst.len() != src.len() {
        return Err(MorphError::BufferLength {
            expected: dst.len(),
            got: src.len(),
        });
    }
    dst.copy_from_slice(src);
    Ok(())
}

impl ParticleBuffer {
    /// Creates `count` particles at `positions` (which also become the
    /// anchors and targets) with the given colors, sizes drawn from
    /// `size_range`, opacity 0 and effect strength 0.
    ///
    /// Returns `MorphError::BufferLength` if `colors` differs in length.
    pub fn new(
        positions: Vec<Vec3>,
        colors: Vec<Vec3>,
        size_range: [f32; 2],
        rng: &mut Xorshift64,
    ) -> Result<Self, MorphError> {
        let count = positions.len();
        if colors.len() != count {
            return Err(MorphError::BufferLength {
                expected: count,
                got: colors.len(),
            });
        }
        let sizes = (0..count)
            .map(|_| rng.next_range(size_range[0], size_range[1]))
            .collect();
        Ok(Self {
            anchors: positions.clone(),
            targets: positions.clone(),
            positions,
            colors,
            sizes,
            opacities: vec![0.0; count],
            effect_strengths: vec![0.0; count],
        })
    }

    /// Creates `count` particles scattered in the configured start cube.
    pub fn scattered(
        count: usize,
        colors: Vec<Vec3>,
        config: &MorphConfig,
        rng: &mut Xorshift64,
    ) -> Result<Self, MorphError> {
        let positions = (0..count)
            .map(|_| rng.in_cube(config.initial_shape_size))
            .collect();
        Self::new(positions, colors, config.particle_size_range, rng)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn set_positions(&mut self, src: &[Vec3]) -> Result<(), MorphError> {
        copy_into(&mut self.positions, src)
    }

    pub fn anchors(&self) -> &[Vec3] {
        &self.anchors
    }

    pub fn set_anchors(&mut self, src: &[Vec3]) -> Result<(), MorphError> {
        copy_into(&mut self.anchors, src)
    }

    /// Copies the live positions into the anchors.
    pub fn anchor_to_positions(&mut self) {
        self.anchors.copy_from_slice(&self.positions);
    }

    pub fn targets(&self) -> &[Vec3] {
        &self.targets
    }

    pub fn set_targets(&mut self, src: &[Vec3]) -> Result<(), MorphError> {
        copy_into(&mut self.targets, src)
    }

    /// Copies the targets into the anchors.
    pub fn anchor_to_targets(&mut self) {
        self.anchors.copy_from_slice(&self.targets);
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn set_colors(&mut self, src: &[Vec3]) -> Result<(), MorphError> {
        copy_into(&mut self.colors, src)
    }

    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    pub fn opacities(&self) -> &[f32] {
        &self.opacities
    }

    pub fn opacities_mut(&mut self) -> &mut [f32] {
        &mut self.opacities
    }

    pub fn effect_strengths(&self) -> &[f32] {
        &self.effect_strengths
    }

    pub fn effect_strengths_mut(&mut self) -> &mut [f32] {
        &mut self.effect_strengths
    }

    /// Split borrow for the per-frame writers.
    pub(crate) fn motion_mut(&mut self) -> Motion<'_> {
        Motion {
            positions: &mut self.positions,
            anchors: &self.anchors,
            targets: &self.targets,
            effect_strengths: &mut self.effect_strengths,
            opacities: &mut self.opacities,
        }
    }

    /// Snaps positions and anchors to `src`, clears effects and makes every
    /// particle fully visible.
    pub fn settle_at(&mut self, src: &[Vec3]) -> Result<(), MorphError> {
        copy_into(&mut self.positions, src)?;
        self.anchors.copy_from_slice(src);
        self.opacities.fill(1.0);
        self.effect_strengths.fill(0.0);
        Ok(())
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            positions: &self.positions,
            colors: &self.colors,
            sizes: &self.sizes,
            opacities: &self.opacities,
            effect_strengths: &self.effect_strengths,
        }
    }

    /// Size and brightness multipliers the renderer applies per particle.
    pub fn render_scales<'a>(
        &'a self,
        config: &'a MorphConfig,
    ) -> impl Iterator<Item = RenderScale> + 'a {
        self.effect_strengths.iter().map(move |&e| RenderScale {
            size: 1.0 - e * config.morph_size_factor,
            brightness: 1.0 + e * config.morph_brightness_factor,
        })
    }
}

//! Seeded 3-D and 4-D scalar noise used for swarm offsets, swirl axes,
//! turbulence and idle drift.
//!
//! Backed by OpenSimplex from the `noise` crate. When seeding fails the field
//! degrades to [`NoiseField::Disabled`], which answers every query with 0 so
//! callers never need an error path.

use crate::error::MorphError;
use crate::prng::entropy_seed;
use glam::Vec3;
use noise::{NoiseFn, OpenSimplex};
use std::fmt;

/// Deterministic scalar field in roughly [-1, 1].
#[derive(Clone)]
pub enum NoiseField {
    Simplex(OpenSimplex),
    /// Zero-returning fallback.
    Disabled,
}

impl NoiseField {
    /// Creates an OpenSimplex field from an explicit seed.
    pub fn new(seed: u32) -> Self {
        NoiseField::Simplex(OpenSimplex::new(seed))
    }

    pub fn disabled() -> Self {
        NoiseField::Disabled
    }

    /// Seeds the field from a non-reproducible source.
    pub fn from_entropy() -> Result<Self, MorphError> {
        let seed = entropy_seed()?;
        Ok(Self::new((seed ^ (seed >> 32)) as u32))
    }

    /// Like [`NoiseField::from_entropy`], but logs the failure and returns the
    /// disabled field instead of an error.
    pub fn from_entropy_or_disabled() -> Self {
        Self::from_entropy().unwrap_or_else(|e| {
            log::warn!("{e}; swirl and turbulence disabled");
            NoiseField::Disabled
        })
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, NoiseField::Simplex(_))
    }

    pub fn sample3(&self, x: f32, y: f32, z: f32) -> f32 {
        match self {
            NoiseField::Simplex(n) => n.get([x as f64, y as f64, z as f64]) as f32,
            NoiseField::Disabled => 0.0,
        }
    }

    pub fn sample4(&self, x: f32, y: f32, z: f32, w: f32) -> f32 {
        match self {
            NoiseField::Simplex(n) => n.get([x as f64, y as f64, z as f64, w as f64]) as f32,
            NoiseField::Disabled => 0.0,
        }
    }

    /// Three decorrelated 4-D lookups at `p * frequency`, channel `k` shifted
    /// by `k * channel_offset` on every spatial axis.
    pub fn flow4(&self, p: Vec3, frequency: f32, channel_offset: f32, time: f32) -> Vec3 {
        let s = p * frequency;
        let channel = |k: f32| {
            let o = k * channel_offset;
            self.sample4(s.x + o, s.y + o, s.z + o, time)
        };
        Vec3::new(channel(0.0), channel(1.0), channel(2.0))
    }
}

impl fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseField::Simplex(_) => f.write_str("NoiseField::Simplex"),
            NoiseField::Disabled => f.write_str("NoiseField::Disabled"),
        }
    }
}

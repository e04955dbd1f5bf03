//! The single owned bundle of mutable animation state.
//!
//! The morph engine, idle driver and controller all take `&mut AnimationState`
//! rather than reaching for process globals, which keeps exactly one writer
//! per frame.

use crate::buffer::ParticleBuffer;
use crate::clock::FrameClock;
use crate::config::MorphConfig;
use crate::error::MorphError;
use crate::noise::NoiseField;
use crate::prng::Xorshift64;
use crate::sampler::TargetSet;

#[derive(Debug)]
pub struct AnimationState {
    pub config: MorphConfig,
    pub noise: NoiseField,
    pub rng: Xorshift64,
    pub clock: FrameClock,
    /// `None` until bootstrap succeeds.
    pub particles: Option<ParticleBuffer>,
    /// Most recent successfully sampled target.
    pub current_target: Option<TargetSet>,
    /// Target sampled from the bootstrap image.
    pub bootstrap_target: Option<TargetSet>,
}

impl AnimationState {
    pub fn new(config: MorphConfig, noise: NoiseField, rng: Xorshift64) -> Self {
        Self {
            config,
            noise,
            rng,
            clock: FrameClock::new(),
            particles: None,
            current_target: None,
            bootstrap_target: None,
        }
    }

    /// Returns `MorphError::NotReady` before bootstrap.
    pub fn particles(&self) -> Result<&ParticleBuffer, MorphError> {
        self.particles.as_ref().ok_or(MorphError::NotReady)
    }

    /// Returns `MorphError::NotReady` before bootstrap.
    pub fn particles_mut(&mut self) -> Result<&mut ParticleBuffer, MorphError> {
        self.particles.as_mut().ok_or(MorphError::NotReady)
    }

    pub fn particle_count(&self) -> usize {
        self.particles.as_ref().map_or(0, ParticleBuffer::len)
    }
}

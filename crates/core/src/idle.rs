//! Gentle drift around the anchors while no morph is running.

use crate::state::AnimationState;

const IDLE_CHANNEL_OFFSET: f32 = 10.0;

/// Eases every particle toward a slowly moving, noise-perturbed copy of its
/// anchor.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleDriver;

impl IdleDriver {
    pub fn new() -> Self {
        Self
    }

    /// One idle frame.
    ///
    /// Moves each position `idle_lerp` of the way toward
    /// `anchor + flow(anchor) * idle_flow_strength` and clears the effect
    /// strengths. When `settled` is true, any particle not yet fully visible
    /// is forced to opacity 1. Does nothing before bootstrap.
    pub fn step(&self, state: &mut AnimationState, settled: bool) {
        let AnimationState {
            config,
            noise,
            clock,
            particles,
            ..
        } = state;
        let Some(buffer) = particles.as_mut() else {
            return;
        };

        let time = clock.elapsed() * config.idle_flow_speed;
        let motion = buffer.motion_mut();
        for (position, &anchor) in motion.positions.iter_mut().zip(motion.anchors) {
            let drifted = anchor
                + noise.flow4(anchor, config.idle_flow_frequency, IDLE_CHANNEL_OFFSET, time)
                    * config.idle_flow_strength;
            *position = position.lerp(drifted, config.idle_lerp);
        }
        motion.effect_strengths.fill(0.0);

        if settled {
            for opacity in motion.opacities.iter_mut().filter(|o| **o != 1.0) {
                *opacity = 1.0;
            }
        }
    }
}

//! Timed morph of every particle from its anchor to its target.
//!
//! Each particle follows a quadratic Bézier through a per-session "swarm"
//! control point that bulges away from the straight path. While the
//! sinusoidal effect envelope is non-trivial, the Bézier point is swirled
//! about a noise-driven axis and displaced by 4-D turbulence.
//!
//! Starting a new session while one is running supersedes it: the live,
//! possibly mid-flight positions become the new anchors and the old
//! session's target is dropped.

use crate::easing::Easing;
use crate::error::MorphError;
use crate::noise::NoiseField;
use crate::prng::Xorshift64;
use crate::state::AnimationState;
use glam::{Quat, Vec3};
use std::f32::consts::PI;

/// Identifies one morph session. Monotonically increasing per engine.
pub type SessionId = u64;

const SWARM_NOISE_SCALE: f32 = 0.05;
const SWARM_DISTANCE_WEIGHT: f32 = 0.2;
const SWARM_JITTER: [f32; 2] = [0.3, 1.0];
const SWIRL_INDEX_SCALE: f32 = 0.02;
const SWIRL_TIME_SCALE: f32 = 0.1;
const SWIRL_JITTER: [f32; 2] = [0.5, 1.0];
const TURBULENCE_CHANNEL_OFFSET: f32 = 100.0;

/// Morph intensity at eased progress `t`: `sin(πt)`, clamped at 0.
pub fn effect_strength(t: f32) -> f32 {
    (t * PI).sin().max(0.0)
}

#[derive(Debug, Clone)]
struct MorphSession {
    id: SessionId,
    swarm: Vec<Vec3>,
    elapsed: f32,
    duration: f32,
    progress: f32,
}

/// Result of advancing the engine by one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MorphStatus {
    Idle,
    Running { session: SessionId, progress: f32 },
    /// The session reached progress 1 this frame; anchors now equal targets.
    Completed(SessionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOutcome {
    pub session: SessionId,
    /// The running session this start replaced, if any.
    pub superseded: Option<SessionId>,
}

/// Drives Idle → Running → (Completed | Cancelled) → Idle.
#[derive(Debug)]
pub struct MorphEngine {
    session: Option<MorphSession>,
    last_id: SessionId,
    easing: Easing,
}

impl Default for MorphEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MorphEngine {
    pub fn new() -> Self {
        Self::with_easing(Easing::MORPH)
    }

    pub fn with_easing(easing: Easing) -> Self {
        Self {
            session: None,
            last_id: 0,
            easing,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Eased progress of the running session.
    pub fn progress(&self) -> Option<f32> {
        self.session.as_ref().map(|s| s.progress)
    }

    /// Swarm control points of the running session.
    pub fn swarm(&self) -> Option<&[Vec3]> {
        self.session.as_ref().map(|s| s.swarm.as_slice())
    }

    /// Begins a morph toward `targets`, superseding any running session.
    ///
    /// The live positions are copied into the anchors and a fresh swarm
    /// point is computed per particle. Returns `MorphError::NotReady` before
    /// bootstrap and `MorphError::BufferLength` if `targets` has the wrong
    /// length; in both cases nothing changes.
    pub fn start(
        &mut self,
        state: &mut AnimationState,
        targets: &[Vec3],
    ) -> Result<StartOutcome, MorphError> {
        let AnimationState {
            config,
            noise,
            rng,
            particles,
            ..
        } = state;
        let buffer = particles.as_mut().ok_or(MorphError::NotReady)?;
        buffer.set_targets(targets)?;
        buffer.anchor_to_positions();

        let swarm = swarm_points(
            buffer.anchors(),
            buffer.targets(),
            noise,
            rng,
            config.swarm_center_offset(),
        );

        let superseded = self.cancel();
        self.last_id += 1;
        let id = self.last_id;
        self.session = Some(MorphSession {
            id,
            swarm,
            elapsed: 0.0,
            duration: config.morph_duration.max(f32::EPSILON),
            progress: 0.0,
        });
        log::info!("morph {id} started for {} particles", buffer.len());
        Ok(StartOutcome {
            session: id,
            superseded,
        })
    }

    /// Stops the running session where it is. Positions are left untouched.
    pub fn cancel(&mut self) -> Option<SessionId> {
        let id = self.session.take().map(|s| s.id)?;
        log::debug!("morph {id} superseded");
        Some(id)
    }

    /// Advances the running session by the clock's last delta and writes
    /// the frame.
    pub fn step(&mut self, state: &mut AnimationState) -> MorphStatus {
        let Some(session) = self.session.as_mut() else {
            return MorphStatus::Idle;
        };
        session.elapsed += state.clock.delta();
        let fraction = (session.elapsed / session.duration).min(1.0);
        session.progress = self.easing.ease(fraction);
        let (id, progress) = (session.id, session.progress);

        self.render(id, progress, state);

        if fraction < 1.0 {
            return MorphStatus::Running {
                session: id,
                progress,
            };
        }
        if let Some(buffer) = state.particles.as_mut() {
            buffer.anchor_to_targets();
        }
        self.session = None;
        log::info!("morph {id} complete");
        MorphStatus::Completed(id)
    }

    /// Writes positions and effect strengths for `session` at eased
    /// progress `t`.
    ///
    /// Returns `false` without writing when `session` is not the active
    /// session, so frames from a superseded session are ignored.
    pub fn render(&self, session: SessionId, t: f32, state: &mut AnimationState) -> bool {
        let Some(active) = self.session.as_ref().filter(|s| s.id == session) else {
            return false;
        };
        let AnimationState {
            config,
            noise,
            rng,
            clock,
            particles,
            ..
        } = state;
        let Some(buffer) = particles.as_mut() else {
            return false;
        };

        let t = t.clamp(0.0, 1.0);
        let effect = effect_strength(t);
        let swirl = effect * config.swirl_factor;
        let turbulence = effect * config.noise_max_strength;
        let elapsed = clock.elapsed();
        let noise_time = elapsed * config.noise_time_scale;
        let swirl_on = swirl > config.effect_threshold && noise.is_enabled();
        let turbulence_on = turbulence > config.effect_threshold && noise.is_enabled();

        let inv = 1.0 - t;
        let (w_anchor, w_swarm, w_target) = (inv * inv, 2.0 * inv * t, t * t);

        let motion = buffer.motion_mut();
        for (i, position) in motion.positions.iter_mut().enumerate() {
            let anchor = motion.anchors[i];
            let mut p = anchor * w_anchor + active.swarm[i] * w_swarm + motion.targets[i] * w_target;

            if swirl_on {
                let axis = swirl_axis(noise, i, elapsed);
                if axis != Vec3::ZERO {
                    let angle = swirl * rng.next_range(SWIRL_JITTER[0], SWIRL_JITTER[1]);
                    p = anchor + Quat::from_axis_angle(axis, angle) * (p - anchor);
                }
            }

            if turbulence_on {
                p += noise.flow4(p, config.noise_frequency, TURBULENCE_CHANNEL_OFFSET, noise_time)
                    * turbulence;
            }

            *position = p;
        }
        motion.effect_strengths.fill(effect);
        true
    }
}

/// Noise-displaced midpoints used as Bézier control points.
fn swarm_points(
    anchors: &[Vec3],
    targets: &[Vec3],
    noise: &NoiseField,
    rng: &mut Xorshift64,
    center_offset: f32,
) -> Vec<Vec3> {
    anchors
        .iter()
        .zip(targets)
        .enumerate()
        .map(|(i, (&from, &to))| {
            let direction = swarm_direction(noise, i, rng);
            let reach = from.distance(to) * SWARM_DISTANCE_WEIGHT + center_offset;
            from.lerp(to, 0.5) + direction * reach * rng.next_range(SWARM_JITTER[0], SWARM_JITTER[1])
        })
        .collect()
}

fn swarm_direction(noise: &NoiseField, index: usize, rng: &mut Xorshift64) -> Vec3 {
    let s = index as f32 * SWARM_NOISE_SCALE;
    let direction = Vec3::new(
        noise.sample3(s, 10.0, 10.0),
        noise.sample3(20.0, s, 20.0),
        noise.sample3(30.0, 30.0, s),
    )
    .normalize_or_zero();
    if direction == Vec3::ZERO {
        rng.unit_vector()
    } else {
        direction
    }
}

fn swirl_axis(noise: &NoiseField, index: usize, elapsed: f32) -> Vec3 {
    let s = index as f32 * SWIRL_INDEX_SCALE;
    let e = elapsed * SWIRL_TIME_SCALE;
    Vec3::new(
        noise.sample3(s, e, 0.0),
        noise.sample3(0.0, s, e + 5.0),
        noise.sample3(e + 10.0, 0.0, s),
    )
    .normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ParticleBuffer;
    use crate::config::MorphConfig;

    const DT: f32 = 1.0 / 60.0;

    fn state_with(count: usize, noise: NoiseField) -> AnimationState {
        let mut rng = Xorshift64::new(17);
        let positions = (0..count)
            .map(|i| Vec3::new(i as f32, -(i as f32), 0.5))
            .collect();
        let buffer =
            ParticleBuffer::new(positions, vec![Vec3::ONE; count], [0.05, 0.15], &mut rng).unwrap();
        let mut state = AnimationState::new(MorphConfig::default(), noise, rng);
        state.particles = Some(buffer);
        state
    }

    fn targets(count: usize) -> Vec<Vec3> {
        (0..count)
            .map(|i| Vec3::new(10.0 - i as f32, 3.0, -2.0))
            .collect()
    }

    fn assert_close(a: &[Vec3], b: &[Vec3], tol: f32) {
        assert_eq!(a.len(), b.len());
        for (i, (p, q)) in a.iter().zip(b).enumerate() {
            assert!(p.distance(*q) <= tol, "particle {i}: {p:?} vs {q:?}");
        }
    }

    fn tick(engine: &mut MorphEngine, state: &mut AnimationState) -> MorphStatus {
        state.clock.advance(DT);
        engine.step(state)
    }

    fn run_to_completion(engine: &mut MorphEngine, state: &mut AnimationState) -> SessionId {
        for _ in 0..10_000 {
            if let MorphStatus::Completed(id) = tick(engine, state) {
                return id;
            }
        }
        panic!("morph never completed");
    }

    #[test]
    fn start_before_bootstrap_is_not_ready() {
        let mut state = AnimationState::new(
            MorphConfig::default(),
            NoiseField::disabled(),
            Xorshift64::new(1),
        );
        let mut engine = MorphEngine::new();
        assert!(matches!(
            engine.start(&mut state, &[]),
            Err(MorphError::NotReady)
        ));
        assert!(!engine.is_running());
    }

    #[test]
    fn start_with_wrong_target_length_changes_nothing() {
        let mut state = state_with(5, NoiseField::disabled());
        let mut engine = MorphEngine::new();
        let before = state.particles().unwrap().targets().to_vec();
        assert!(matches!(
            engine.start(&mut state, &targets(4)),
            Err(MorphError::BufferLength { expected: 5, got: 4 })
        ));
        assert!(!engine.is_running());
        assert_eq!(state.particles().unwrap().targets(), before.as_slice());
    }

    #[test]
    fn start_anchors_at_live_positions() {
        let mut state = state_with(6, NoiseField::new(1));
        state
            .particles_mut()
            .unwrap()
            .set_positions(&[Vec3::splat(2.0); 6])
            .unwrap();
        let mut engine = MorphEngine::new();
        let outcome = engine.start(&mut state, &targets(6)).unwrap();
        assert_eq!(outcome.superseded, None);
        assert_eq!(engine.session_id(), Some(outcome.session));
        assert_eq!(state.particles().unwrap().anchors(), &[Vec3::splat(2.0); 6]);
        assert_eq!(state.particles().unwrap().targets(), targets(6).as_slice());
    }

    #[test]
    fn swarm_points_bulge_within_expected_reach() {
        for noise in [NoiseField::new(4), NoiseField::disabled()] {
            let mut state = state_with(50, noise);
            let mut engine = MorphEngine::new();
            engine.start(&mut state, &targets(50)).unwrap();
            let offset = state.config.swarm_center_offset();
            let buffer = state.particles().unwrap();
            let swarm = engine.swarm().unwrap();
            for i in 0..50 {
                let (a, b) = (buffer.anchors()[i], buffer.targets()[i]);
                let reach = a.distance(b) * 0.2 + offset;
                let bulge = swarm[i].distance(a.lerp(b, 0.5));
                assert!(
                    bulge >= reach * 0.3 - 1e-3 && bulge <= reach + 1e-3,
                    "particle {i}: bulge {bulge} outside [{}, {reach}]",
                    reach * 0.3
                );
            }
        }
    }

    #[test]
    fn endpoints_hit_anchor_and_target() {
        let mut state = state_with(20, NoiseField::new(9));
        state.clock.advance(12.5);
        let mut engine = MorphEngine::new();
        let id = engine.start(&mut state, &targets(20)).unwrap().session;
        let anchors = state.particles().unwrap().anchors().to_vec();

        assert!(engine.render(id, 0.0, &mut state));
        assert_close(state.particles().unwrap().positions(), &anchors, 1e-5);
        assert!(state.particles().unwrap().effect_strengths().iter().all(|&e| e.abs() < 1e-6));

        assert!(engine.render(id, 1.0, &mut state));
        assert_close(state.particles().unwrap().positions(), &targets(20), 1e-5);
        assert!(state.particles().unwrap().effect_strengths().iter().all(|&e| e.abs() < 1e-6));

        assert!(engine.render(id, 0.5, &mut state));
        assert!(state
            .particles()
            .unwrap()
            .effect_strengths()
            .iter()
            .all(|&e| (e - 1.0).abs() < 1e-6));
    }

    #[test]
    fn effect_strength_follows_sine_envelope_each_frame() {
        let mut state = state_with(8, NoiseField::new(2));
        let mut engine = MorphEngine::new();
        engine.start(&mut state, &targets(8)).unwrap();
        while let MorphStatus::Running { progress, .. } = tick(&mut engine, &mut state) {
            let expected = (progress * PI).sin();
            for &e in state.particles().unwrap().effect_strengths() {
                assert!((e - expected).abs() < 1e-5, "effect {e} vs sin(pi*{progress})");
            }
        }
    }

    #[test]
    fn completion_settles_on_target() {
        let mut state = state_with(12, NoiseField::new(5));
        let mut engine = MorphEngine::new();
        let id = engine.start(&mut state, &targets(12)).unwrap().session;
        assert_eq!(run_to_completion(&mut engine, &mut state), id);

        let buffer = state.particles().unwrap();
        assert_close(buffer.positions(), &targets(12), 1e-5);
        assert_eq!(buffer.anchors(), targets(12).as_slice());
        assert!(buffer.effect_strengths().iter().all(|&e| e.abs() < 1e-6));
        assert!(!engine.is_running());
        assert_eq!(tick(&mut engine, &mut state), MorphStatus::Idle);
    }

    #[test]
    fn completion_takes_configured_duration() {
        let mut state = state_with(3, NoiseField::disabled());
        state.config.morph_duration = 0.5;
        let mut engine = MorphEngine::new();
        engine.start(&mut state, &targets(3)).unwrap();
        let mut frames = 0;
        while !matches!(tick(&mut engine, &mut state), MorphStatus::Completed(_)) {
            frames += 1;
        }
        // 0.5 s at 60 fps, allowing for float accumulation.
        assert!((29..=30).contains(&frames), "completed after {frames} frames");
    }

    #[test]
    fn restart_mid_flight_uses_live_positions_and_drops_old_target() {
        let mut state = state_with(10, NoiseField::new(8));
        let mut engine = MorphEngine::new();
        let first = engine.start(&mut state, &targets(10)).unwrap().session;
        let original_anchors = state.particles().unwrap().anchors().to_vec();
        for _ in 0..45 {
            tick(&mut engine, &mut state);
        }
        assert!(engine.progress().unwrap() < 1.0);
        let live = state.particles().unwrap().positions().to_vec();
        assert_ne!(live, original_anchors);

        let second_targets: Vec<Vec3> = (0..10).map(|i| Vec3::new(0.0, i as f32, 7.0)).collect();
        let outcome = engine.start(&mut state, &second_targets).unwrap();
        assert_eq!(outcome.superseded, Some(first));
        assert_ne!(outcome.session, first);
        assert_eq!(state.particles().unwrap().anchors(), live.as_slice());
        assert_eq!(state.particles().unwrap().targets(), second_targets.as_slice());
        assert_eq!(engine.progress(), Some(0.0));

        // A late frame from the first session must not land.
        let before = state.particles().unwrap().positions().to_vec();
        assert!(!engine.render(first, 0.5, &mut state));
        assert_eq!(state.particles().unwrap().positions(), before.as_slice());

        run_to_completion(&mut engine, &mut state);
        assert_close(state.particles().unwrap().positions(), &second_targets, 1e-5);
    }

    #[test]
    fn cancel_leaves_positions_where_they_are() {
        let mut state = state_with(4, NoiseField::new(3));
        let mut engine = MorphEngine::new();
        let id = engine.start(&mut state, &targets(4)).unwrap().session;
        for _ in 0..20 {
            tick(&mut engine, &mut state);
        }
        let frozen = state.particles().unwrap().positions().to_vec();
        assert_eq!(engine.cancel(), Some(id));
        assert_eq!(engine.cancel(), None);
        assert_eq!(tick(&mut engine, &mut state), MorphStatus::Idle);
        assert_eq!(state.particles().unwrap().positions(), frozen.as_slice());
    }

    #[test]
    fn without_noise_the_path_is_the_pure_bezier() {
        let mut state = state_with(16, NoiseField::disabled());
        let mut engine = MorphEngine::new();
        engine.start(&mut state, &targets(16)).unwrap();
        for _ in 0..60 {
            let MorphStatus::Running { progress: t, .. } = tick(&mut engine, &mut state) else {
                panic!("morph ended early");
            };
            let buffer = state.particles().unwrap();
            let swarm = engine.swarm().unwrap();
            let expected: Vec<Vec3> = (0..16)
                .map(|i| {
                    let inv = 1.0 - t;
                    buffer.anchors()[i] * inv * inv
                        + swarm[i] * 2.0 * inv * t
                        + buffer.targets()[i] * t * t
                })
                .collect();
            assert_close(buffer.positions(), &expected, 1e-4);
        }
        run_to_completion(&mut engine, &mut state);
        assert_close(state.particles().unwrap().positions(), &targets(16), 1e-5);
    }

    #[test]
    fn with_noise_mid_flight_leaves_the_pure_bezier() {
        let mut state = state_with(16, NoiseField::new(21));
        let mut engine = MorphEngine::new();
        let id = engine.start(&mut state, &targets(16)).unwrap().session;
        engine.render(id, 0.5, &mut state);
        let buffer = state.particles().unwrap();
        let swarm = engine.swarm().unwrap();
        let deviates = (0..16).any(|i| {
            let plain = buffer.anchors()[i] * 0.25 + swarm[i] * 0.5 + buffer.targets()[i] * 0.25;
            plain.distance(buffer.positions()[i]) > 1e-3
        });
        assert!(deviates, "swirl and turbulence had no effect at peak");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn effect_strength_is_sine_of_progress(t in 0.0_f32..=1.0) {
                prop_assert!((effect_strength(t) - (t * PI).sin()).abs() < 1e-6);
                prop_assert!((0.0..=1.0).contains(&effect_strength(t)));
            }
        }
    }
}

//! Frame-driven orchestration of bootstrap, image requests, morphs and idle.
//!
//! The controller owns the [`AnimationState`] and is its only writer. Image
//! decoding happens elsewhere; results come back through
//! [`MorphController::deliver`] tagged with the [`RequestId`] handed out by
//! [`MorphController::begin_request`], and only the newest request is
//! honoured.

use std::fmt;

use crate::buffer::ParticleBuffer;
use crate::config::MorphConfig;
use crate::error::MorphError;
use crate::idle::IdleDriver;
use crate::morph::{MorphEngine, MorphStatus, SessionId};
use crate::noise::NoiseField;
use crate::opacity::OpacityFade;
use crate::prng::Xorshift64;
use crate::sampler::{DecodedImage, ImageSampler, TargetSet};
use crate::state::AnimationState;

/// What an off-frame image load hands back to the controller.
pub type ImageLoadResult = Result<DecodedImage, MorphError>;

/// Tags an image request; larger is newer.
pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    /// A request is loading or its morph is playing.
    Morphing,
}

/// User-facing status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Loading(String),
    Morphing(String),
    Ready(String),
    Interrupted,
    LoadFailed(String),
    SystemError,
    InitFailed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Loading(name) => write!(f, "Loading \"{name}\"..."),
            Status::Morphing(name) => write!(f, "Morphing to \"{name}\"..."),
            Status::Ready(name) => write!(f, "{name}"),
            Status::Interrupted => write!(f, "Morph interrupted"),
            Status::LoadFailed(reason) => write!(f, "Error loading image: {reason}"),
            Status::SystemError => write!(f, "System error"),
            Status::InitFailed => write!(f, "Failed to initialize particles"),
        }
    }
}

/// Camera and UI collaborator notified on state transitions.
pub trait SceneHooks {
    fn set_auto_rotate(&mut self, enabled: bool);
    fn set_busy(&mut self, busy: bool);
    fn set_status(&mut self, status: &Status);
}

/// Hooks that ignore every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHooks;

impl SceneHooks for NullHooks {
    fn set_auto_rotate(&mut self, _enabled: bool) {}
    fn set_busy(&mut self, _busy: bool) {}
    fn set_status(&mut self, _status: &Status) {}
}

/// Where the particles were snapped after a failed or aborted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySource {
    CurrentTarget,
    Bootstrap,
    RandomCube,
}

/// Outcome of handing a load result to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Started(SessionId),
    Recovered(RecoverySource),
    /// A newer request was issued after this one; the result was dropped.
    Stale,
}

pub struct MorphController<H: SceneHooks = NullHooks> {
    state: AnimationState,
    engine: MorphEngine,
    idle: IdleDriver,
    sampler: ImageSampler,
    fade: Option<OpacityFade>,
    hooks: H,
    phase: ControllerState,
    latest_request: RequestId,
    /// Request still awaiting its result. Taken on delivery.
    pending: Option<RequestId>,
    morph_name: Option<String>,
    settled: bool,
}

impl<H: SceneHooks> MorphController<H> {
    /// Creates a controller seeded from the wall clock. Noise falls back to
    /// the disabled field if it cannot be seeded.
    pub fn new(config: MorphConfig, hooks: H) -> Self {
        let state = AnimationState::new(
            config,
            NoiseField::from_entropy_or_disabled(),
            Xorshift64::from_entropy(),
        );
        Self::with_parts(state, hooks)
    }

    /// Creates a controller around prepared state, for pinned seeds.
    pub fn with_parts(state: AnimationState, hooks: H) -> Self {
        let sampler = ImageSampler::from_config(&state.config);
        Self {
            state,
            engine: MorphEngine::new(),
            idle: IdleDriver::new(),
            sampler,
            fade: None,
            hooks,
            phase: ControllerState::Idle,
            latest_request: 0,
            pending: None,
            morph_name: None,
            settled: false,
        }
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn config(&self) -> &MorphConfig {
        &self.state.config
    }

    pub fn particles(&self) -> Result<&ParticleBuffer, MorphError> {
        self.state.particles()
    }

    pub fn particle_count(&self) -> usize {
        self.state.particle_count()
    }

    pub fn phase(&self) -> ControllerState {
        self.phase
    }

    pub fn engine(&self) -> &MorphEngine {
        &self.engine
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn latest_request(&self) -> RequestId {
        self.latest_request
    }

    /// Whether the last morph finished and its fade played out.
    pub fn is_settled(&self) -> bool {
        self.settled && self.fade.is_none()
    }

    /// Creates the particle set from the bootstrap image and starts the
    /// reveal morph out of the initial cube.
    ///
    /// The particle count is the image's opaque pixel count, or
    /// `default_particle_count` when it has none. Returns the count.
    pub fn bootstrap(&mut self, image: ImageLoadResult, name: &str) -> Result<usize, MorphError> {
        if self.state.particles.is_some() {
            log::warn!("particle set already exists, ignoring bootstrap of {name}");
            return Ok(self.state.particle_count());
        }

        let image = match image {
            Ok(image) => image,
            Err(e) => {
                log::error!("bootstrap image {name} failed: {e}");
                self.hooks.set_busy(false);
                self.hooks.set_status(&Status::InitFailed);
                return Err(e);
            }
        };

        let opaque = image.opaque_count(self.sampler.alpha_threshold);
        let count = if opaque == 0 {
            log::warn!(
                "bootstrap image {name} has no opaque pixels, using {} particles",
                self.state.config.default_particle_count
            );
            self.state.config.default_particle_count
        } else {
            opaque
        };

        let targets = self.sampler.sample(&image, count, &mut self.state.rng);
        let buffer = ParticleBuffer::scattered(
            count,
            targets.colors().to_vec(),
            &self.state.config,
            &mut self.state.rng,
        )?;
        self.state.particles = Some(buffer);
        log::info!("bootstrapped {count} particles from {name}");

        self.hooks.set_auto_rotate(false);
        self.hooks.set_busy(true);
        self.hooks.set_status(&Status::Morphing(name.to_string()));

        self.engine.start(&mut self.state, targets.positions())?;
        self.fade = Some(OpacityFade::fade_in(self.state.config.morph_duration));
        self.state.bootstrap_target = Some(targets.clone());
        self.state.current_target = Some(targets);
        self.morph_name = Some(name.to_string());
        self.phase = ControllerState::Morphing;
        self.settled = false;
        Ok(count)
    }

    /// Registers a new image request and freezes any running morph where
    /// it is until the image arrives.
    ///
    /// Results for every earlier request become stale.
    pub fn begin_request(&mut self, name: &str) -> RequestId {
        self.latest_request += 1;
        self.pending = Some(self.latest_request);
        if let Some(session) = self.engine.cancel() {
            log::debug!("request {} interrupts morph {session}", self.latest_request);
        }
        self.phase = ControllerState::Morphing;
        self.settled = false;
        self.hooks.set_auto_rotate(false);
        self.hooks.set_busy(true);
        self.hooks.set_status(&Status::Loading(name.to_string()));
        self.latest_request
    }

    /// Applies the result of request `id`.
    ///
    /// Only the newest outstanding request is honoured, and only once.
    ///
    /// A decoded image is sampled to the particle count, its colors are
    /// applied at once and a morph toward it starts from the live
    /// positions. A failed load snaps the particles back through the
    /// recovery chain. Fails with `NotReady` before bootstrap, after
    /// returning the UI to an actionable state.
    pub fn deliver(
        &mut self,
        id: RequestId,
        name: &str,
        result: ImageLoadResult,
    ) -> Result<Delivery, MorphError> {
        if self.pending != Some(id) {
            log::debug!("dropping stale result for request {id} ({name})");
            return Ok(Delivery::Stale);
        }
        self.pending = None;

        let image = match result {
            Ok(image) => image,
            Err(e) => {
                log::warn!("loading {name} failed: {e}");
                let source = self.recover(Status::LoadFailed(e.to_string()));
                return Ok(Delivery::Recovered(source));
            }
        };

        let count = self.state.particle_count();
        let Some(buffer) = self.state.particles.as_mut() else {
            log::error!("image {name} arrived before the particle set exists");
            self.phase = ControllerState::Idle;
            self.hooks.set_auto_rotate(true);
            self.hooks.set_busy(false);
            self.hooks.set_status(&Status::SystemError);
            return Err(MorphError::NotReady);
        };

        let targets = self.sampler.sample(&image, count, &mut self.state.rng);
        buffer.set_colors(targets.colors())?;
        let outcome = self.engine.start(&mut self.state, targets.positions())?;
        self.state.current_target = Some(targets);
        self.fade = Some(OpacityFade::dip(self.state.config.morph_duration));
        self.morph_name = Some(name.to_string());
        self.phase = ControllerState::Morphing;
        self.settled = false;
        self.hooks.set_status(&Status::Morphing(name.to_string()));
        Ok(Delivery::Started(outcome.session))
    }

    /// Advances every per-frame animation by `dt` seconds.
    ///
    /// Exactly one of the morph engine and the idle driver writes positions
    /// each frame. Never fails.
    pub fn tick(&mut self, dt: f32) -> MorphStatus {
        self.state.clock.advance(dt);
        let delta = self.state.clock.delta();

        let faded = match (self.fade.as_mut(), self.state.particles.as_mut()) {
            (Some(fade), Some(buffer)) => fade.step(delta, buffer.opacities_mut()),
            _ => false,
        };
        if faded {
            self.fade = None;
        }

        let status = self.engine.step(&mut self.state);
        match status {
            MorphStatus::Completed(_) => self.complete(),
            MorphStatus::Idle if self.phase == ControllerState::Idle => {
                let settled = self.is_settled();
                self.idle.step(&mut self.state, settled);
            }
            _ => {}
        }
        status
    }

    /// Interrupts an in-flight request or morph and snaps the particles
    /// through the recovery chain. Returns `None` if nothing was in flight.
    pub fn abort(&mut self) -> Option<RecoverySource> {
        if self.phase != ControllerState::Morphing {
            return None;
        }
        // Results still loading for the aborted request must not land.
        self.pending = None;
        if let Some(session) = self.engine.cancel() {
            log::info!("morph {session} aborted");
        }
        Some(self.recover(Status::Interrupted))
    }

    fn complete(&mut self) {
        self.phase = ControllerState::Idle;
        self.settled = true;
        let name = self.morph_name.take().unwrap_or_default();
        self.hooks.set_auto_rotate(true);
        self.hooks.set_busy(false);
        self.hooks.set_status(&Status::Ready(name));
    }

    /// Snaps positions and anchors to the most recent valid target, else
    /// the bootstrap target, else a fresh random cube.
    fn recover(&mut self, status: Status) -> RecoverySource {
        self.engine.cancel();
        self.fade = None;
        self.morph_name = None;
        self.phase = ControllerState::Idle;
        self.settled = true;
        self.hooks.set_auto_rotate(true);
        self.hooks.set_busy(false);

        let count = self.state.particle_count();
        let (source, target) = if let Some(t) = self.state.current_target.clone() {
            (RecoverySource::CurrentTarget, t)
        } else if let Some(t) = self.state.bootstrap_target.clone() {
            (RecoverySource::Bootstrap, t)
        } else {
            let cube = TargetSet::random_cube(
                count,
                self.state.config.initial_shape_size,
                &mut self.state.rng,
            );
            (RecoverySource::RandomCube, cube)
        };
        log::info!("recovering particles from {source:?}");

        if let Some(buffer) = self.state.particles.as_mut() {
            let snapped = buffer
                .settle_at(target.positions())
                .and_then(|()| buffer.set_targets(target.positions()));
            let recolored = match source {
                RecoverySource::RandomCube => Ok(()),
                _ => buffer.set_colors(target.colors()),
            };
            if let Err(e) = snapped.and(recolored) {
                log::error!("recovery target does not fit the particle set: {e}");
            }
        }
        // The cube is a placeholder shape, not a target to return to.
        if source != RecoverySource::RandomCube {
            self.state.current_target = Some(target);
        }
        self.hooks.set_status(&status);
        source
    }
}

#![deny(unsafe_code)]
//! Core of the particle morph system.
//!
//! Provides `NoiseField`, `ImageSampler`, the structure-of-arrays
//! `ParticleBuffer`, the `MorphEngine` and `IdleDriver` per-frame writers,
//! the `OpacityFade` track and the `MorphController` state machine that
//! drives them from a single frame tick. No I/O; decoded images come in as
//! `DecodedImage`.

pub mod buffer;
pub mod clock;
pub mod config;
pub mod controller;
pub mod easing;
pub mod error;
pub mod idle;
pub mod morph;
pub mod noise;
pub mod opacity;
pub mod params;
pub mod prng;
pub mod sampler;
pub mod state;

pub use buffer::{FrameView, ParticleBuffer, RenderScale};
pub use clock::FrameClock;
pub use config::MorphConfig;
pub use controller::{
    ControllerState, Delivery, ImageLoadResult, MorphController, NullHooks, RecoverySource,
    RequestId, SceneHooks, Status,
};
pub use easing::Easing;
pub use error::MorphError;
pub use idle::IdleDriver;
pub use morph::{effect_strength, MorphEngine, MorphStatus, SessionId, StartOutcome};
pub use noise::NoiseField;
pub use opacity::OpacityFade;
pub use prng::Xorshift64;
pub use sampler::{DecodedImage, ImageSampler, SampleRegime, TargetSet};
pub use state::AnimationState;

//! Error types for the particle-morph core.

use thiserror::Error;

/// Errors produced while acquiring images, bootstrapping the particle set,
/// or starting a morph.
///
/// None of these are raised from the per-frame paths; the controller
/// validates inputs before they reach the morph or idle loops.
#[derive(Debug, Error)]
pub enum MorphError {
    /// Source bytes could not be decoded into an image.
    #[error("image decode failed: {0}")]
    Decode(String),

    /// A morph was requested before the particle set exists.
    #[error("particle set is not ready")]
    NotReady,

    /// The noise subsystem could not be seeded.
    #[error("noise initialization failed: {0}")]
    NoiseInit(String),

    /// The image has no pixel above the opacity threshold.
    #[error("image has no opaque pixels")]
    EmptyImage,

    /// The RGBA buffer size does not match width × height, a size overflows,
    /// or an output viewport has no area.
    #[error("invalid dimensions: size overflows, does not match the pixel buffer, or leaves an empty viewport")]
    InvalidDimensions,

    /// A wholesale array replace was given the wrong number of elements.
    #[error("buffer length mismatch: expected {expected} elements, got {got}")]
    BufferLength { expected: usize, got: usize },

    /// Reading or writing a file failed.
    #[error("{0}")]
    Io(String),
}

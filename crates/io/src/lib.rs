#![deny(unsafe_code)]
//! Collaborators around the particle morph core: the image decode service,
//! an off-frame loader thread and CPU-side snapshot rendering.
//!
//! Decoding and PNG output are feature-gated behind `png` (default on). The
//! splat renderer in [`pixel`] is always available.

pub mod pixel;

#[cfg(feature = "png")]
pub mod decode;
#[cfg(feature = "png")]
pub mod loader;
#[cfg(feature = "png")]
pub mod snapshot;

pub use pixel::{splat_to_rgba, Viewport};

#[cfg(feature = "png")]
pub use decode::{decode_image, read_image};
#[cfg(feature = "png")]
pub use loader::{ImageLoader, LoadSource, LoadedImage};
#[cfg(feature = "png")]
pub use snapshot::write_png;

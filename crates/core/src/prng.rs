//! Seedable Xorshift64 PRNG used for every random decision in the core.
//!
//! Sampling, swarm jitter, swirl factors and the initial cube all draw from
//! one generator owned by the animation state. Tests seed it explicitly;
//! a running process seeds it once from the wall clock.

use crate::error::MorphError;
use glam::Vec3;
use std::f32::consts::TAU;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reads a non-reproducible 64-bit seed from the system clock.
///
/// Returns `MorphError::NoiseInit` if the clock reads earlier than the Unix
/// epoch, the only way this source can fail.
pub fn entropy_seed() -> Result<u64, MorphError> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| MorphError::NoiseInit(e.to_string()))?
        .as_nanos();
    Ok(nanos as u64)
}

/// Xorshift64 PRNG with shifts (13, 7, 17).
///
/// A seed of 0 is replaced by a fixed non-zero constant, since zero is a
/// fixed point of the algorithm.
#[derive(Debug, Clone)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    const FALLBACK_SEED: u64 = 0x5EED_DEAD_BEEF_CAFE;

    /// Creates a generator from an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { Self::FALLBACK_SEED } else { seed },
        }
    }

    /// Creates a generator seeded from the wall clock.
    ///
    /// Falls back to the fixed seed when the clock is unusable; randomness
    /// quality then degrades but nothing fails.
    pub fn from_entropy() -> Self {
        Self::new(entropy_seed().unwrap_or(Self::FALLBACK_SEED))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform `f64` in [0, 1) built from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform `f32` in [0, 1) built from the upper 24 bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u32 << 24) as f32
    }

    /// Uniform `f32` in [min, max).
    pub fn next_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }

    /// Uniform `usize` in [0, max).
    ///
    /// # Panics
    ///
    /// Panics if `max` is 0.
    pub fn next_usize(&mut self, max: usize) -> usize {
        (self.next_u64() % max as u64) as usize
    }

    /// Uniformly distributed direction on the unit sphere.
    pub fn unit_vector(&mut self) -> Vec3 {
        let z = self.next_range(-1.0, 1.0);
        let theta = self.next_range(0.0, TAU);
        let r = (1.0 - z * z).max(0.0).sqrt();
        Vec3::new(r * theta.cos(), r * theta.sin(), z)
    }

    /// Uniform point inside an axis-aligned cube of edge `size` centred on
    /// the origin.
    pub fn in_cube(&mut self, size: f32) -> Vec3 {
        let half = size * 0.5;
        Vec3::new(
            self.next_range(-half, half),
            self.next_range(-half, half),
            self.next_range(-half, half),
        )
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_usize(i + 1);
            items.swap(i, j);
        }
    }
}

impl Default for Xorshift64 {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_first_value_for_seed_42() {
        // Changing this breaks every seeded CLI run.
        let mut rng = Xorshift64::new(42);
        assert_eq!(rng.next_u64(), 45_454_805_674);
    }

    #[test]
    fn zero_seed_is_replaced() {
        let mut rng = Xorshift64::new(0);
        assert!((0..3).all(|_| rng.next_u64() != 0));
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Xorshift64::new(7);
        let mut b = Xorshift64::new(7);
        for i in 0..500 {
            assert_eq!(a.next_u64(), b.next_u64(), "diverged at {i}");
        }
    }

    #[test]
    fn entropy_seed_succeeds_on_a_sane_clock() {
        assert!(entropy_seed().is_ok());
    }

    #[test]
    fn next_f32_in_unit_interval() {
        let mut rng = Xorshift64::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v), "next_f32() = {v}");
        }
    }

    #[test]
    fn unit_vector_has_unit_length() {
        let mut rng = Xorshift64::new(3);
        for _ in 0..1000 {
            let v = rng.unit_vector();
            assert!((v.length() - 1.0).abs() < 1e-4, "length {}", v.length());
        }
    }

    #[test]
    fn in_cube_stays_inside_half_extent() {
        let mut rng = Xorshift64::new(99);
        for _ in 0..1000 {
            let p = rng.in_cube(8.0);
            assert!(p.abs().max_element() <= 4.0, "{p:?} escaped the cube");
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = Xorshift64::new(5);
        let mut items: Vec<usize> = (0..100).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
        assert_ne!(items, sorted, "100 elements should not stay in order");
    }

    #[test]
    fn shuffle_handles_empty_and_single() {
        let mut rng = Xorshift64::new(5);
        let mut empty: [u8; 0] = [];
        rng.shuffle(&mut empty);
        let mut one = [9];
        rng.shuffle(&mut one);
        assert_eq!(one, [9]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn next_range_in_bounds(seed: u64, min in -1e3_f32..1e3, span in 0.001_f32..1e3) {
                let max = min + span;
                let mut rng = Xorshift64::new(seed);
                for _ in 0..100 {
                    let v = rng.next_range(min, max);
                    prop_assert!(v >= min && v <= max, "{v} outside [{min}, {max}]");
                }
            }

            #[test]
            fn next_usize_below_max(seed: u64, max in 1_usize..10_000) {
                let mut rng = Xorshift64::new(seed);
                for _ in 0..100 {
                    prop_assert!(rng.next_usize(max) < max);
                }
            }
        }
    }
}

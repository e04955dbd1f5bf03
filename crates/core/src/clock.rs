//! Controller-owned frame clock.

/// Accumulates per-frame deltas into an elapsed time, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    elapsed: f32,
    delta: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by `dt` seconds. Negative or non-finite deltas count as 0.
    pub fn advance(&mut self, dt: f32) {
        self.delta = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += self.delta;
    }

    /// Seconds since the clock was created.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Length of the most recent frame.
    pub fn delta(&self) -> f32 {
        self.delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates() {
        let mut clock = FrameClock::new();
        clock.advance(0.5);
        clock.advance(0.25);
        assert_eq!(clock.elapsed(), 0.75);
        assert_eq!(clock.delta(), 0.25);
    }

    #[test]
    fn bad_deltas_are_ignored() {
        let mut clock = FrameClock::new();
        clock.advance(-1.0);
        clock.advance(f32::NAN);
        clock.advance(f32::INFINITY);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.delta(), 0.0);
    }
}

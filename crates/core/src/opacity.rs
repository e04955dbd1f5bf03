//! Keyframed opacity track, run on the same frame tick as the morph.

use crate::easing::Easing;

const FADE_IN_HOLD: f32 = 0.2;
const DIP_OUT: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    Hold { duration: f32 },
    Tween { to: f32, duration: f32, easing: Easing },
}

impl Segment {
    fn duration(self) -> f32 {
        match self {
            Segment::Hold { duration } | Segment::Tween { duration, .. } => duration,
        }
    }

    fn apply(self, fraction: f32, from: &[f32], opacities: &mut [f32]) {
        if let Segment::Tween { to, easing, .. } = self {
            let k = easing.ease(fraction);
            for (o, &start) in opacities.iter_mut().zip(from) {
                *o = start + (to - start) * k;
            }
        }
    }
}

/// A sequence of holds and tweens applied to every particle's opacity.
///
/// Each tween starts from the particle's live opacity at the moment the
/// tween begins, so a replacement fade continues smoothly from wherever the
/// previous one left off.
#[derive(Debug, Clone)]
pub struct OpacityFade {
    segments: Vec<Segment>,
    index: usize,
    elapsed: f32,
    from: Option<Vec<f32>>,
}

impl OpacityFade {
    fn from_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            index: 0,
            elapsed: 0.0,
            from: None,
        }
    }

    /// Bootstrap reveal: hold for a fifth of `duration`, then rise linearly
    /// to 1 over the rest.
    pub fn fade_in(duration: f32) -> Self {
        let duration = duration.max(0.0);
        Self::from_segments(vec![
            Segment::Hold {
                duration: duration * FADE_IN_HOLD,
            },
            Segment::Tween {
                to: 1.0,
                duration: duration * (1.0 - FADE_IN_HOLD),
                easing: Easing::Linear,
            },
        ])
    }

    /// Per-request dip: ease out to 0 over 30% of `duration`, then ease
    /// back in to 1.
    pub fn dip(duration: f32) -> Self {
        let duration = duration.max(0.0);
        Self::from_segments(vec![
            Segment::Tween {
                to: 0.0,
                duration: duration * DIP_OUT,
                easing: Easing::OutQuad,
            },
            Segment::Tween {
                to: 1.0,
                duration: duration * (1.0 - DIP_OUT),
                easing: Easing::InQuad,
            },
        ])
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.segments.len()
    }

    /// Total length of the track in seconds.
    pub fn duration(&self) -> f32 {
        self.segments.iter().map(|s| s.duration()).sum()
    }

    /// Advances by `dt` seconds, writing into `opacities`. Returns `true`
    /// once every segment has played out.
    pub fn step(&mut self, dt: f32, opacities: &mut [f32]) -> bool {
        let mut remaining = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        while let Some(&segment) = self.segments.get(self.index) {
            let from = self.from.get_or_insert_with(|| opacities.to_vec());
            if from.len() != opacities.len() {
                *from = opacities.to_vec();
            }

            let duration = segment.duration();
            let left = duration - self.elapsed;
            if remaining < left {
                self.elapsed += remaining;
                segment.apply(self.elapsed / duration, from, opacities);
                return false;
            }

            remaining -= left.max(0.0);
            segment.apply(1.0, from, opacities);
            self.index += 1;
            self.elapsed = 0.0;
            self.from = None;
        }
        true
    }
}

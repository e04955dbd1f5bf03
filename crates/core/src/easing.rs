//! Timing curves mapping linear time fraction to eased progress.

/// An easing curve over [0, 1] with `ease(0) = 0` and `ease(1) = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    InQuad,
    OutQuad,
    /// CSS-style cubic Bézier through (0,0), (x1,y1), (x2,y2), (1,1).
    CubicBezier { x1: f32, y1: f32, x2: f32, y2: f32 },
}

const NEWTON_ITERATIONS: usize = 8;
const NEWTON_MIN_SLOPE: f32 = 1e-3;
const BISECTION_ITERATIONS: usize = 32;
const SOLVE_EPSILON: f32 = 1e-6;

impl Easing {
    /// The morph timeline curve: slow start, long gentle landing.
    pub const MORPH: Easing = Easing::CubicBezier {
        x1: 0.4,
        y1: 0.0,
        x2: 0.2,
        y2: 1.0,
    };

    /// Eased progress for linear fraction `t`, clamped to [0, 1].
    pub fn ease(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::InQuad => t * t,
            Easing::OutQuad => t * (2.0 - t),
            Easing::CubicBezier { x1, y1, x2, y2 } => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let s = solve_bezier_x(t, x1, x2);
                bezier(s, y1, y2)
            }
        }
    }
}

/// One coordinate of a cubic Bézier with endpoints 0 and 1.
fn bezier(s: f32, p1: f32, p2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn bezier_slope(s: f32, p1: f32, p2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Finds the curve parameter whose x-coordinate is `x`.
///
/// Newton steps first; bisection when the slope is too flat to trust.
fn solve_bezier_x(x: f32, x1: f32, x2: f32) -> f32 {
    let mut s = x;
    for _ in 0..NEWTON_ITERATIONS {
        let slope = bezier_slope(s, x1, x2);
        if slope.abs() < NEWTON_MIN_SLOPE {
            break;
        }
        let err = bezier(s, x1, x2) - x;
        if err.abs() < SOLVE_EPSILON {
            return s;
        }
        s = (s - err / slope).clamp(0.0, 1.0);
    }

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    s = x;
    for _ in 0..BISECTION_ITERATIONS {
        let err = bezier(s, x1, x2) - x;
        if err.abs() < SOLVE_EPSILON {
            break;
        }
        if err > 0.0 {
            hi = s;
        } else {
            lo = s;
        }
        s = 0.5 * (lo + hi);
    }
    s
}

//! Piecewise-linear keyframe curves (torque curves, tension response curves).

use serde::{Deserialize, Serialize};

/// A single `(x, y)` keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub x: f32,
    pub y: f32,
}

/// Sorted keyframes, evaluated by linear interpolation.
///
/// Inputs left of the first key return the first value, inputs right of the
/// last key return the last value. An empty curve evaluates to `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct Curve {
    keys: Vec<Keyframe>,
}

impl Curve {
    pub fn new(points: &[(f32, f32)]) -> Self {
        points
            .iter()
            .map(|&(x, y)| Keyframe { x, y })
            .collect::<Vec<_>>()
            .into()
    }

    /// Identity ramp over [0, 1].
    pub fn linear() -> Self {
        Self::new(&[(0.0, 0.0), (1.0, 1.0)])
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };

        if x <= first.x {
            return first.y;
        }
        if x >= last.x {
            return last.y;
        }

        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if x <= b.x {
                let span = b.x - a.x;
                if span <= f32::EPSILON {
                    return b.y;
                }
                let t = (x - a.x) / span;
                return a.y + (b.y - a.y) * t;
            }
        }

        last.y
    }
}

impl From<Vec<Keyframe>> for Curve {
    fn from(mut keys: Vec<Keyframe>) -> Self {
        keys.retain(|k| k.x.is_finite() && k.y.is_finite());
        keys.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self { keys }
    }
}

impl From<Curve> for Vec<Keyframe> {
    fn from(curve: Curve) -> Self {
        curve.keys
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

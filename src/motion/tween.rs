//! Easing curves and a time-driven tween.
//!
//! A [`Tween`] interpolates between two values over a fixed duration; it is
//! advanced with frame deltas in seconds, the same way the particle field is.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// An easing curve mapping linear progress `t` in `[0, 1]` to eased progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    /// No easing.
    Linear,
    /// CSS `ease`, i.e. `cubic-bezier(0.25, 0.1, 0.25, 1)`.
    #[default]
    Ease,
    /// Sine in-out, symmetric around the midpoint.
    SineInOut,
    /// Cubic ease-out: fast start, long settle.
    Power3Out,
}

impl Easing {
    /// Applies the curve to `t`, clamped to `[0, 1]`.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Self::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Self::Power3Out => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// Evaluate a CSS cubic bezier timing function with control points
/// `(x1, y1)` and `(x2, y2)` at input progress `x`.
fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    // Polynomial coefficients for one axis of a bezier anchored at 0 and 1
    let coeffs = |p1: f32, p2: f32| {
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        let a = 1.0 - c - b;
        (a, b, c)
    };
    let (ax, bx, cx) = coeffs(x1, x2);
    let (ay, by, cy) = coeffs(y1, y2);
    let sample_x = |t: f32| ((ax * t + bx) * t + cx) * t;
    let slope_x = |t: f32| (3.0 * ax * t + 2.0 * bx) * t + cx;
    let sample_y = |t: f32| ((ay * t + by) * t + cy) * t;

    // Newton first, bisection if the slope flattens out
    let mut t = x;
    for _ in 0..8 {
        let err = sample_x(t) - x;
        if err.abs() < 1e-6 {
            return sample_y(t);
        }
        let slope = slope_x(t);
        if slope.abs() < 1e-6 {
            break;
        }
        t -= err / slope;
    }

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    t = x;
    for _ in 0..32 {
        let value = sample_x(t);
        if (value - x).abs() < 1e-6 {
            break;
        }
        if value < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) * 0.5;
    }
    sample_y(t)
}

/// A one-shot interpolation from `from` to `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
    easing: Easing,
}

impl Tween {
    /// Creates a tween lasting `duration` seconds. A non-positive duration
    /// completes on the first update.
    #[must_use]
    pub fn new(from: f32, to: f32, duration: f32, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
            easing,
        }
    }

    /// Linear progress, 0 to 1.
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            if self.elapsed > 0.0 { 1.0 } else { 0.0 }
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    /// Current interpolated value.
    pub fn value(&self) -> f32 {
        let eased = self.easing.apply(self.progress());
        self.from + (self.to - self.from) * eased
    }

    /// Returns true once the end value has been reached.
    pub fn is_complete(&self) -> bool {
        self.progress() >= 1.0
    }

    /// Advances by `dt` seconds and returns the new value.
    pub fn update(&mut self, dt: f32) -> f32 {
        // A zero-length tween still needs one update to finish
        self.elapsed += dt.max(f32::EPSILON);
        if self.is_complete() {
            return self.to;
        }
        self.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 4] = [Easing::Linear, Easing::Ease, Easing::SineInOut, Easing::Power3Out];

    #[test]
    fn test_easing_endpoints() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-4, "{:?}", easing);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-4, "{:?}", easing);
        }
    }

    #[test]
    fn test_easing_clamps_input() {
        for easing in ALL {
            assert_eq!(easing.apply(-3.0), easing.apply(0.0));
            assert_eq!(easing.apply(7.0), easing.apply(1.0));
            assert_eq!(easing.apply(f32::NAN), easing.apply(0.0));
        }
    }

    #[test]
    fn test_easing_is_monotonic() {
        for easing in ALL {
            let mut prev = 0.0;
            for i in 1..=50 {
                let v = easing.apply(i as f32 / 50.0);
                assert!(v >= prev - 1e-5, "{:?} dipped at step {}", easing, i);
                prev = v;
            }
        }
    }

    #[test]
    fn test_css_ease_midpoint() {
        // cubic-bezier(.25,.1,.25,1) at x = 0.5 is about 0.8024
        assert!((Easing::Ease.apply(0.5) - 0.8024).abs() < 1e-3);
    }

    #[test]
    fn test_sine_in_out_is_symmetric() {
        assert!((Easing::SineInOut.apply(0.5) - 0.5).abs() < 1e-6);
        let a = Easing::SineInOut.apply(0.2);
        let b = Easing::SineInOut.apply(0.8);
        assert!((a + b - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_tween_reaches_target() {
        let mut tween = Tween::new(0.0, 20.0, 0.5, Easing::Linear);
        assert_eq!(tween.value(), 0.0);
        assert!((tween.update(0.25) - 10.0).abs() < 1e-4);
        assert!(!tween.is_complete());
        assert_eq!(tween.update(0.3), 20.0);
        assert!(tween.is_complete());
    }

    #[test]
    fn test_zero_duration_tween_completes_on_first_update() {
        let mut tween = Tween::new(1.0, 0.0, 0.0, Easing::Ease);
        assert!(!tween.is_complete());
        assert_eq!(tween.update(0.0), 0.0);
        assert!(tween.is_complete());
    }
}

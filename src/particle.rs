//! The particle record and its per-frame integration.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// One decorative point in the field.
///
/// Everything except `position` and `phase` is fixed at creation. The layout
/// is `#[repr(C)]` and [`Pod`] so a whole population can be copied into a GPU
/// instance buffer with `bytemuck::cast_slice`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Position in viewport CSS pixels.
    pub position: Vec2,
    /// Drift applied once per frame, in CSS pixels.
    pub velocity: Vec2,
    /// Circle radius in CSS pixels.
    pub radius: f32,
    /// Opacity before twinkle modulation.
    pub base_alpha: f32,
    /// Twinkle phase in radians. Grows without bound.
    pub phase: f32,
    /// Twinkle angular speed in radians per second.
    pub speed: f32,
}

impl Particle {
    /// Advance twinkle phase by `dt` seconds and drift by one frame.
    #[inline]
    pub fn step(&mut self, dt: f32) {
        self.phase += self.speed * dt;
        self.position += self.velocity;
    }

    /// Teleport to the opposite edge once outside `[-margin, bounds + margin]`.
    #[inline]
    pub fn wrap(&mut self, bounds: Vec2, margin: f32) {
        self.position.x = wrap_axis(self.position.x, bounds.x, margin);
        self.position.y = wrap_axis(self.position.y, bounds.y, margin);
    }

    /// Opacity to draw with this frame.
    #[inline]
    pub fn alpha(&self) -> f32 {
        twinkle_alpha(self.base_alpha, self.phase)
    }
}

/// `base * (0.6 + 0.4 * sin(phase))`, clamped to `[0, 1]`.
///
/// The modulation keeps a star between 20% and 100% of its base opacity, so
/// it never fully disappears.
#[inline]
pub fn twinkle_alpha(base_alpha: f32, phase: f32) -> f32 {
    let alpha = base_alpha * (0.6 + 0.4 * phase.sin());
    if alpha.is_nan() {
        return 0.0;
    }
    alpha.clamp(0.0, 1.0)
}

#[inline]
fn wrap_axis(value: f32, extent: f32, margin: f32) -> f32 {
    if value < -margin {
        extent + margin
    } else if value > extent + margin {
        -margin
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn star() -> Particle {
        Particle {
            position: Vec2::new(10.0, 10.0),
            velocity: Vec2::new(0.5, -0.25),
            radius: 1.0,
            base_alpha: 0.5,
            phase: 0.0,
            speed: 2.0,
        }
    }

    #[test]
    fn test_step_integrates_phase_and_drift() {
        let mut p = star();
        p.step(0.5);
        assert_eq!(p.phase, 1.0);
        assert_eq!(p.position, Vec2::new(10.5, 9.75));
    }

    #[test]
    fn test_wrap_each_edge() {
        let bounds = Vec2::new(100.0, 50.0);
        let mut p = star();

        p.position = Vec2::new(-2.5, 20.0);
        p.wrap(bounds, 2.0);
        assert_eq!(p.position.x, 102.0);

        p.position = Vec2::new(102.5, 20.0);
        p.wrap(bounds, 2.0);
        assert_eq!(p.position.x, -2.0);

        p.position = Vec2::new(20.0, -3.0);
        p.wrap(bounds, 2.0);
        assert_eq!(p.position.y, 52.0);

        p.position = Vec2::new(20.0, 53.0);
        p.wrap(bounds, 2.0);
        assert_eq!(p.position.y, -2.0);
    }

    #[test]
    fn test_wrap_inside_margin_is_untouched() {
        let mut p = star();
        p.position = Vec2::new(-1.5, 51.5);
        p.wrap(Vec2::new(100.0, 50.0), 2.0);
        assert_eq!(p.position, Vec2::new(-1.5, 51.5));
    }

    #[test]
    fn test_twinkle_extremes() {
        assert!((twinkle_alpha(1.0, FRAC_PI_2) - 1.0).abs() < 1e-6);
        assert!((twinkle_alpha(1.0, -FRAC_PI_2) - 0.2).abs() < 1e-6);
        assert!((twinkle_alpha(0.5, 0.0) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_twinkle_alpha_always_unit_interval() {
        let mut phase = -50.0 * PI;
        while phase < 50.0 * PI {
            for base in [0.0, 0.25, 0.85, 1.0, 3.0, -1.0] {
                let a = twinkle_alpha(base, phase);
                assert!((0.0..=1.0).contains(&a), "alpha {a} for base {base} phase {phase}");
            }
            phase += 0.37;
        }
        assert_eq!(twinkle_alpha(0.5, f32::INFINITY), 0.0);
    }

    #[test]
    fn test_particle_is_gpu_castable() {
        let stars = [star(), star()];
        let bytes: &[u8] = bytemuck::cast_slice(&stars);
        assert_eq!(bytes.len(), 2 * 8 * 4);
    }
}

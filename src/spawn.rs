//! Spawn context for particle initialization.
//!
//! Wraps the RNG used to build a population so the field code reads as
//! "a radius in this range" rather than RNG plumbing.

use crate::field::FieldConfig;
use crate::particle::Particle;
use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Random helpers for one population regeneration.
///
/// ```ignore
/// let mut ctx = SpawnContext::new(0, 240, Vec2::new(1024.0, 768.0));
/// let radius = ctx.random_range(0.3, 1.9);
/// let position = ctx.random_in_bounds();
/// ```
pub struct SpawnContext {
    /// Index of the particle being spawned (0 to count-1).
    pub index: u32,
    /// Total number of particles being spawned.
    pub count: u32,
    /// Extent of the area particles are scattered over, in CSS pixels.
    pub bounds: Vec2,
    rng: SmallRng,
}

impl SpawnContext {
    /// Create a context seeded from OS entropy.
    pub fn new(index: u32, count: u32, bounds: Vec2) -> Self {
        Self {
            index,
            count,
            bounds,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Create a context with a fixed seed, for benchmarks and tests.
    pub fn seeded(seed: u64, count: u32, bounds: Vec2) -> Self {
        Self {
            index: 0,
            count,
            bounds,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Normalized progress through the spawn (0.0 to 1.0).
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        self.index as f32 / self.count as f32
    }

    // ========== Random primitives ==========

    /// Random f32 between 0.0 and 1.0.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in `min..max`. A degenerate range yields `min`.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    /// Random f32 in `-half..half`.
    #[inline]
    pub fn random_signed(&mut self, half: f32) -> f32 {
        let half = half.abs();
        self.random_range(-half, half)
    }

    /// Random angle in `0..TAU`.
    #[inline]
    pub fn random_phase(&mut self) -> f32 {
        self.rng.gen_range(0.0..TAU)
    }

    // ========== Position helpers ==========

    /// Random point in `[0, bounds.x) x [0, bounds.y)`.
    pub fn random_in_bounds(&mut self) -> Vec2 {
        Vec2::new(
            self.random_range(0.0, self.bounds.x),
            self.random_range(0.0, self.bounds.y),
        )
    }

    // ========== Particles ==========

    /// Build the next particle from `config`'s ranges and advance `index`.
    pub fn particle(&mut self, config: &FieldConfig) -> Particle {
        let (r_min, r_max) = config.radius;
        let (a_min, a_max) = config.base_alpha;
        let (s_min, s_max) = config.twinkle_speed;

        let particle = Particle {
            position: self.random_in_bounds(),
            velocity: Vec2::new(
                self.random_signed(config.drift),
                self.random_signed(config.drift),
            ),
            radius: self.random_range(r_min, r_max),
            base_alpha: self.random_range(a_min, a_max),
            phase: self.random_phase(),
            speed: self.random_range(s_min, s_max),
        };
        self.index += 1;
        particle
    }

    /// Build `count` particles.
    pub fn population(&mut self, config: &FieldConfig) -> Vec<Particle> {
        (0..self.count).map(|_| self.particle(config)).collect()
    }
}

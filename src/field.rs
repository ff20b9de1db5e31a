//! The ambient particle field: configuration, population and per-frame step.
//!
//! A [`ParticleField`] owns a population of [`Particle`]s scattered over the
//! viewport. Each frame it twinkles and drifts them, wraps them around the
//! edges, and draws them as circles onto a [`DrawSurface`].
//!
//! The population is tied to the viewport it was generated for. Every resize
//! throws the whole population away and builds a new one sized by the
//! viewport's [`SizeClass`], so no particle ever lives in a coordinate space
//! that no longer exists.
//!
//! # Example
//!
//! ```ignore
//! let config = FieldConfig::default().with_counts(80, 160);
//! let mut field = ParticleField::new(config, Viewport::new(1024.0, 768.0));
//!
//! // One frame
//! field.update(1.0 / 60.0);
//! field.render(&mut surface);
//! ```

use crate::error::ConfigError;
use crate::particle::Particle;
use crate::spawn::SpawnContext;
use crate::surface::DrawSurface;
use crate::time::DEFAULT_MAX_DELTA;
use crate::viewport::Viewport;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Coarse viewport-width bucket that picks the population size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    /// Narrower than the breakpoint (phones).
    Small,
    /// At or above the breakpoint.
    Large,
}

impl SizeClass {
    /// Bucket for a viewport `width` given the `breakpoint`.
    pub fn for_width(width: f32, breakpoint: f32) -> Self {
        if width < breakpoint {
            SizeClass::Small
        } else {
            SizeClass::Large
        }
    }
}

/// Configuration for a particle field.
///
/// All ranges are `(min, max)` and sampled uniformly. Defaults reproduce the
/// portfolio starfield: 140 stars on small screens, 240 on large ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Population below the breakpoint.
    pub small_count: u32,
    /// Population at or above the breakpoint.
    pub large_count: u32,
    /// Viewport width (CSS px) separating the size classes.
    pub breakpoint: f32,
    /// Circle radius range in CSS pixels.
    pub radius: (f32, f32),
    /// Base opacity range.
    pub base_alpha: (f32, f32),
    /// Twinkle angular speed range in radians per second.
    pub twinkle_speed: (f32, f32),
    /// Maximum drift per frame along each axis, in CSS pixels.
    pub drift: f32,
    /// Distance past the viewport edge before a particle wraps.
    pub margin: f32,
    /// Upper bound on a frame delta, in seconds.
    pub max_delta: f32,
    /// Fill color (linear RGB, 0-1).
    pub color: Vec3,
}

impl FieldConfig {
    /// The default starfield color, `#f3ebb2`.
    pub const STAR_COLOR: Vec3 = Vec3::new(243.0 / 255.0, 235.0 / 255.0, 178.0 / 255.0);

    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            small_count: 140,
            large_count: 240,
            breakpoint: 768.0,
            radius: (0.3, 1.9),
            base_alpha: (0.25, 0.85),
            twinkle_speed: (0.3, 1.1),
            drift: 0.01,
            margin: 2.0,
            max_delta: DEFAULT_MAX_DELTA,
            color: Self::STAR_COLOR,
        }
    }

    /// Set the small and large population sizes.
    pub fn with_counts(mut self, small: u32, large: u32) -> Self {
        self.small_count = small;
        self.large_count = large;
        self
    }

    /// Set the size-class breakpoint in CSS pixels.
    pub fn with_breakpoint(mut self, breakpoint: f32) -> Self {
        self.breakpoint = breakpoint;
        self
    }

    /// Set the radius range.
    pub fn with_radius(mut self, min: f32, max: f32) -> Self {
        self.radius = (min, max);
        self
    }

    /// Set the base opacity range.
    pub fn with_base_alpha(mut self, min: f32, max: f32) -> Self {
        self.base_alpha = (min, max);
        self
    }

    /// Set the twinkle speed range (radians per second).
    pub fn with_twinkle_speed(mut self, min: f32, max: f32) -> Self {
        self.twinkle_speed = (min, max);
        self
    }

    /// Set the maximum per-frame drift.
    pub fn with_drift(mut self, drift: f32) -> Self {
        self.drift = drift;
        self
    }

    /// Set the wraparound margin.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Set the frame delta clamp in seconds.
    pub fn with_max_delta(mut self, max_delta: f32) -> Self {
        self.max_delta = max_delta;
        self
    }

    /// Set the fill color.
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    /// Set the fill color from a CSS hex string (`#rgb`, `#rrggbb` or `#rrggbbaa`).
    ///
    /// The alpha byte, if any, is ignored; opacity comes from the twinkle.
    pub fn with_color_hex(mut self, hex: &str) -> Result<Self, ConfigError> {
        self.color = parse_hex_color(hex).ok_or_else(|| ConfigError::Color(hex.to_string()))?;
        Ok(self)
    }

    /// Population size for `class`.
    pub fn count_for(&self, class: SizeClass) -> u32 {
        match class {
            SizeClass::Small => self.small_count,
            SizeClass::Large => self.large_count,
        }
    }

    /// Check every range and scalar.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("radius", self.radius)?;
        check_range("base_alpha", self.base_alpha)?;
        check_range("twinkle_speed", self.twinkle_speed)?;
        check_non_negative("radius", self.radius.0)?;
        check_non_negative("drift", self.drift)?;
        check_non_negative("margin", self.margin)?;
        check_non_negative("max_delta", self.max_delta)?;
        check_non_negative("breakpoint", self.breakpoint)?;
        Ok(())
    }

    /// Parse and validate a JSON document. Missing keys take default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: FieldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn check_range(field: &'static str, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange { field, min, max })
    }
}

fn check_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` into linear 0-1 RGB.
pub fn parse_hex_color(hex: &str) -> Option<Vec3> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);

    match digits.len() {
        3 => {
            let mut rgb = [0.0; 3];
            for (i, c) in digits.chars().enumerate() {
                let d = c.to_digit(16)? as f32;
                rgb[i] = (d * 17.0) / 255.0;
            }
            Some(Vec3::from(rgb))
        }
        6 | 8 => Some(Vec3::new(
            channel(digits.get(0..2)?)?,
            channel(digits.get(2..4)?)?,
            channel(digits.get(4..6)?)?,
        )),
        _ => None,
    }
}

/// A population of particles bound to one viewport.
#[derive(Debug, Clone)]
pub struct ParticleField {
    config: FieldConfig,
    viewport: Viewport,
    size_class: SizeClass,
    generation: u64,
    particles: Vec<Particle>,
}

impl ParticleField {
    /// Create a field and generate its first population for `viewport`.
    pub fn new(config: FieldConfig, viewport: Viewport) -> Self {
        let mut field = Self::empty(config, viewport);
        field.regenerate(viewport);
        field
    }

    /// Like [`ParticleField::new`] but with a fixed RNG seed.
    pub fn seeded(config: FieldConfig, viewport: Viewport, seed: u64) -> Self {
        let mut field = Self::empty(config, viewport);
        let class = SizeClass::for_width(viewport.width, field.config.breakpoint);
        let mut ctx = SpawnContext::seeded(seed, field.config.count_for(class), bounds_of(&viewport));
        field.replace_population(viewport, class, &mut ctx);
        field
    }

    fn empty(config: FieldConfig, viewport: Viewport) -> Self {
        Self {
            size_class: SizeClass::for_width(viewport.width, config.breakpoint),
            config,
            viewport,
            generation: 0,
            particles: Vec::new(),
        }
    }

    /// Discard the population and build a new one for `viewport`.
    ///
    /// Always regenerates, even when the size class is unchanged: the old
    /// positions were scattered over the previous viewport's extent.
    pub fn regenerate(&mut self, viewport: Viewport) {
        let class = SizeClass::for_width(viewport.width, self.config.breakpoint);
        let mut ctx = SpawnContext::new(0, self.config.count_for(class), bounds_of(&viewport));
        self.replace_population(viewport, class, &mut ctx);
    }

    fn replace_population(&mut self, viewport: Viewport, class: SizeClass, ctx: &mut SpawnContext) {
        self.viewport = viewport;
        self.size_class = class;
        self.particles = ctx.population(&self.config);
        self.generation += 1;
        log::debug!(
            "particle field regenerated: {:?} class, {} particles for {}x{} (generation {})",
            class,
            self.particles.len(),
            viewport.width,
            viewport.height,
            self.generation
        );
    }

    /// Advance every particle by `dt` seconds, clamped to the configured bound.
    pub fn update(&mut self, dt: f32) {
        let dt = dt.max(0.0).min(self.config.max_delta);
        let bounds = bounds_of(&self.viewport);
        let margin = self.config.margin;
        for particle in &mut self.particles {
            particle.step(dt);
            particle.wrap(bounds, margin);
        }
    }

    /// Clear `surface` and draw every particle at its current opacity.
    pub fn render(&self, surface: &mut dyn DrawSurface) {
        surface.clear();
        for particle in &self.particles {
            surface.fill_circle(particle.position, particle.radius, self.config.color, particle.alpha());
        }
    }

    /// Update, then render. One animation frame.
    pub fn step(&mut self, dt: f32, surface: &mut dyn DrawSurface) {
        self.update(dt);
        self.render(surface);
    }

    /// Current population.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Number of particles in the current population.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True when the current population is empty.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Incremented every time the population is regenerated.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Size class of the current population.
    pub fn size_class(&self) -> SizeClass {
        self.size_class
    }

    /// Viewport the current population was generated for.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Field configuration.
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }
}

fn bounds_of(viewport: &Viewport) -> Vec2 {
    Vec2::new(viewport.width.max(0.0), viewport.height.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, RecordingSurface};

    #[test]
    fn test_size_class_threshold() {
        assert_eq!(SizeClass::for_width(767.9, 768.0), SizeClass::Small);
        assert_eq!(SizeClass::for_width(768.0, 768.0), SizeClass::Large);
    }

    #[test]
    fn test_large_then_small_regeneration() {
        let config = FieldConfig::default();
        let mut field = ParticleField::new(config.clone(), Viewport::new(1024.0, 768.0));
        assert_eq!(field.size_class(), SizeClass::Large);
        assert_eq!(field.len(), config.large_count as usize);
        assert_eq!(field.generation(), 1);

        field.regenerate(Viewport::new(320.0, 480.0));
        assert_eq!(field.size_class(), SizeClass::Small);
        assert_eq!(field.len(), config.small_count as usize);
        assert_eq!(field.generation(), 2);
        assert!(field.particles().iter().all(|p| p.position.x < 320.0 && p.position.y < 480.0));
    }

    #[test]
    fn test_positions_stay_within_margin() {
        let config = FieldConfig::default().with_drift(3.0);
        let viewport = Viewport::new(200.0, 100.0);
        let mut field = ParticleField::seeded(config.clone(), viewport, 9);
        for _ in 0..2_000 {
            field.update(1.0 / 60.0);
            for p in field.particles() {
                assert!(p.position.x >= -config.margin && p.position.x <= viewport.width + config.margin);
                assert!(p.position.y >= -config.margin && p.position.y <= viewport.height + config.margin);
            }
        }
    }

    #[test]
    fn test_update_clamps_delta() {
        let config = FieldConfig::default().with_drift(0.0);
        let mut field = ParticleField::seeded(config.clone(), Viewport::new(100.0, 100.0), 3);
        let before: Vec<f32> = field.particles().iter().map(|p| p.phase).collect();
        field.update(10.0);
        for (p, phase) in field.particles().iter().zip(before) {
            let expected = phase + p.speed * config.max_delta;
            assert!((p.phase - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_render_clears_then_draws_every_particle() {
        let field = ParticleField::seeded(FieldConfig::default(), Viewport::new(1024.0, 768.0), 1);
        let mut surface = RecordingSurface::new();
        field.render(&mut surface);

        let commands = surface.commands();
        assert_eq!(commands[0], DrawCommand::Clear);
        assert_eq!(commands.len(), field.len() + 1);
        for cmd in &commands[1..] {
            match cmd {
                DrawCommand::Circle { color, alpha, .. } => {
                    assert_eq!(*color, FieldConfig::STAR_COLOR);
                    assert!((0.0..=1.0).contains(alpha));
                }
                other => panic!("unexpected command {other:?}"),
            }
        }
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(parse_hex_color("#f3ebb2ff"), Some(FieldConfig::STAR_COLOR));
        assert_eq!(parse_hex_color("f3ebb2"), Some(FieldConfig::STAR_COLOR));
        assert_eq!(parse_hex_color("#fff"), Some(Vec3::ONE));
        assert_eq!(parse_hex_color("#12"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let config = FieldConfig::default().with_radius(2.0, 1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { field: "radius", .. })
        ));
        assert!(FieldConfig::default().with_drift(-1.0).validate().is_err());
        assert!(FieldConfig::default().validate().is_ok());
    }

    #[test]
    fn test_json_partial_config_uses_defaults() {
        let config = FieldConfig::from_json(r#"{ "small_count": 10, "color": [1.0, 0.0, 0.0] }"#).unwrap();
        assert_eq!(config.small_count, 10);
        assert_eq!(config.large_count, 240);
        assert_eq!(config.color, Vec3::X);
    }

    #[test]
    fn test_json_round_trip() {
        let config = FieldConfig::default().with_counts(3, 5).with_margin(4.0);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(FieldConfig::from_json(&json).unwrap(), config);
    }
}

//! Integration tests for the particle field and its mount lifecycle.
//!
//! These drive the field the way a page would: through an `Environment`, a
//! frame scheduler and a recording surface.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use stardrift::field::{FieldConfig, ParticleField, SizeClass};
use stardrift::lifecycle::{mount_field, MountState};
use stardrift::particle::twinkle_alpha;
use stardrift::scheduler::{FrameCallback, FrameHandle, FrameQueue, FrameScheduler};
use stardrift::surface::{DrawCommand, RecordingSurface};
use stardrift::viewport::{Environment, Viewport};

// ============================================================================
// Helpers
// ============================================================================

/// Scheduler that ignores cancellation, so already-requested callbacks still
/// run. Used to prove disposed instances check their own state.
#[derive(Default)]
struct StubbornScheduler {
    queue: RefCell<Vec<FrameCallback>>,
}

impl StubbornScheduler {
    fn force_frame(&self, timestamp: f64) -> usize {
        let due = std::mem::take(&mut *self.queue.borrow_mut());
        let count = due.len();
        for callback in due {
            callback(timestamp);
        }
        count
    }
}

impl FrameScheduler for StubbornScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let mut queue = self.queue.borrow_mut();
        queue.push(callback);
        FrameHandle::new(queue.len() as u64)
    }

    fn cancel_frame(&self, _handle: FrameHandle) {}

    fn now(&self) -> f64 {
        0.0
    }
}

fn queue_host(width: f32, height: f32) -> (Rc<Environment>, Rc<FrameQueue>, Rc<dyn FrameScheduler>) {
    let env = Rc::new(Environment::new(Viewport::new(width, height)));
    let frames = Rc::new(FrameQueue::new());
    let scheduler: Rc<dyn FrameScheduler> = frames.clone();
    (env, frames, scheduler)
}

// ============================================================================
// Simulation properties
// ============================================================================

#[test]
fn test_particles_stay_within_margin_after_many_steps() {
    let config = FieldConfig::default().with_drift(12.0).with_margin(2.0);
    let viewport = Viewport::new(300.0, 200.0);
    let mut field = ParticleField::seeded(config, viewport, 11);

    for _ in 0..2_000 {
        field.update(0.016);
        for p in field.particles() {
            assert!(p.position.x >= -2.0 && p.position.x <= 302.0, "x = {}", p.position.x);
            assert!(p.position.y >= -2.0 && p.position.y <= 202.0, "y = {}", p.position.y);
        }
    }
}

#[test]
fn test_rendered_opacity_is_bounded_for_any_phase() {
    for base in [0.0, 0.25, 0.85, 1.0, 1.5] {
        for i in -400..400 {
            let a = twinkle_alpha(base, i as f32 * 0.37);
            assert!((0.0..=1.0).contains(&a), "base {} phase step {} -> {}", base, i, a);
        }
    }
}

#[test]
fn test_large_to_small_regeneration_replaces_everyone() {
    let (env, _frames, scheduler) = queue_host(1024.0, 768.0);
    let surface = RecordingSurface::new();
    let handle = mount_field(&env, &scheduler, Some(Box::new(surface.clone())), FieldConfig::default());

    assert_eq!(handle.size_class(), Some(SizeClass::Large));
    assert_eq!(handle.particle_count(), 240);
    let old = handle.particles();
    let generation = handle.generation();

    env.resize(Viewport::new(320.0, 480.0));

    assert_eq!(handle.size_class(), Some(SizeClass::Small));
    assert_eq!(handle.particle_count(), 140);
    assert_eq!(handle.generation(), generation + 1);
    let new = handle.particles();
    assert!(new.iter().all(|p| !old.contains(p)));
    assert!(new
        .iter()
        .all(|p| p.position.x <= 320.0 && p.position.y <= 480.0));
}

#[test]
fn test_resize_recomputes_backing_store() {
    let (env, _frames, scheduler) = queue_host(800.0, 600.0);
    let surface = RecordingSurface::new();
    let _handle = mount_field(&env, &scheduler, Some(Box::new(surface.clone())), FieldConfig::default());
    surface.take();

    env.resize(Viewport::new(333.3, 200.0).with_device_pixel_ratio(1.5));

    assert_eq!(
        surface.commands(),
        vec![
            DrawCommand::Resize { width: 499, height: 300 },
            DrawCommand::Transform { scale: 1.5 },
        ]
    );
}

#[test]
fn test_update_precedes_render_within_a_frame() {
    let (env, frames, scheduler) = queue_host(800.0, 600.0);
    let surface = RecordingSurface::new();
    let handle = mount_field(&env, &scheduler, Some(Box::new(surface.clone())), FieldConfig::default());

    frames.advance(16.0);
    let drawn: Vec<Vec2> = surface
        .last_frame()
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Circle { center, .. } => Some(*center),
            _ => None,
        })
        .collect();
    let positions: Vec<Vec2> = handle.particles().iter().map(|p| p.position).collect();
    assert_eq!(drawn, positions);
}

#[test]
fn test_stalled_frame_is_clamped() {
    let (env, frames, scheduler) = queue_host(800.0, 600.0);
    let surface = RecordingSurface::new();
    let handle = mount_field(&env, &scheduler, Some(Box::new(surface)), FieldConfig::default());

    frames.advance(16.0);
    let before = handle.particles();
    // Ten seconds in the background
    frames.advance(10_000.0);
    let after = handle.particles();

    for (a, b) in before.iter().zip(&after) {
        let expected = a.speed * 0.033;
        assert!((b.phase - a.phase - expected).abs() < 1e-4);
    }
}

// ============================================================================
// Disposal
// ============================================================================

#[test]
fn test_forced_tick_after_dispose_draws_nothing() {
    let env = Rc::new(Environment::new(Viewport::new(800.0, 600.0)));
    let stubborn = Rc::new(StubbornScheduler::default());
    let scheduler: Rc<dyn FrameScheduler> = stubborn.clone();
    let surface = RecordingSurface::new();
    let handle = mount_field(&env, &scheduler, Some(Box::new(surface.clone())), FieldConfig::default());

    handle.dispose();
    surface.take();

    // The scheduler never honoured the cancel, so the callback still runs
    assert_eq!(stubborn.force_frame(16.0), 1);
    assert!(surface.is_empty());

    env.resize(Viewport::new(320.0, 480.0));
    assert!(surface.is_empty());
    assert_eq!(handle.state(), MountState::Disposed);
}

#[test]
fn test_independent_mounts_do_not_share_state() {
    let (env, frames, scheduler) = queue_host(1024.0, 768.0);
    let a = RecordingSurface::new();
    let b = RecordingSurface::new();
    let first = mount_field(&env, &scheduler, Some(Box::new(a.clone())), FieldConfig::default());
    let second = mount_field(
        &env,
        &scheduler,
        Some(Box::new(b.clone())),
        FieldConfig::default().with_counts(10, 20),
    );

    frames.advance(16.0);
    assert_eq!(a.last_frame().len(), 240);
    assert_eq!(b.last_frame().len(), 20);

    first.dispose();
    b.take();
    frames.advance(16.0);
    assert_eq!(b.last_frame().len(), 20);
    assert!(second.is_running());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_json_round_trip() {
    let config = FieldConfig::default()
        .with_counts(50, 90)
        .with_color_hex("#abc")
        .unwrap();
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(FieldConfig::from_json(&json).unwrap(), config);
}

#[test]
fn test_partial_json_fills_defaults() {
    let config = FieldConfig::from_json(r#"{ "large_count": 400 }"#).unwrap();
    assert_eq!(config.large_count, 400);
    assert_eq!(config.small_count, FieldConfig::default().small_count);
}

#[test]
fn test_load_reports_missing_file() {
    let err = FieldConfig::load("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, stardrift::ConfigError::Io(_)));
}

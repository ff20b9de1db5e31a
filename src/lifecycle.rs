//! Mounting a particle field onto a host.
//!
//! [`mount_field`] wires a [`ParticleField`] to a drawing surface, the host's
//! resize signal and the frame scheduler, and hands back a [`FieldHandle`]
//! that tears all of it down again.
//!
//! # States
//!
//! | State | Meaning |
//! |-------|---------|
//! | [`MountState::Unmounted`] | No surface was available; nothing runs |
//! | [`MountState::Initialized`] | Surface sized, population generated |
//! | [`MountState::Running`] | Frame loop scheduled |
//! | [`MountState::Disposed`] | Loop cancelled, listener removed, inert |
//!
//! A resize while running re-enters initialization: the backing store is
//! recomputed from the device pixel ratio and the population is regenerated.
//!
//! # Disposal
//!
//! [`FieldHandle::dispose`] is synchronous. It flips a flag that every callback
//! checks before touching the field or the surface, then cancels the pending
//! frame and unsubscribes from the environment. Dropping the handle disposes.

use crate::error::CapabilityError;
use crate::field::{FieldConfig, ParticleField, SizeClass};
use crate::particle::Particle;
use crate::scheduler::{self, Animated, FrameHandle, FrameScheduler};
use crate::surface::DrawSurface;
use crate::time::Time;
use crate::viewport::{Environment, HostEvent, ListenerId, Viewport};
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

/// Where a mounted field is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    /// Never started (no surface).
    Unmounted,
    /// Surface sized and population generated, loop not yet scheduled.
    Initialized,
    /// Frame loop active.
    Running,
    /// Torn down. Nothing will run again.
    Disposed,
}

struct Simulation {
    field: ParticleField,
    surface: Box<dyn DrawSurface>,
    time: Time,
}

impl Simulation {
    /// Match the backing store to `viewport` at device resolution.
    fn size_surface(&mut self, viewport: Viewport) {
        let (width, height) = viewport.backing_size();
        self.surface.resize_backing(width, height);
        self.surface.set_transform(viewport.device_pixel_ratio);
    }

    /// Resize the surface and regenerate the population.
    fn resize(&mut self, viewport: Viewport) {
        self.size_surface(viewport);
        self.field.regenerate(viewport);
    }
}

struct MountedField {
    state: Cell<MountState>,
    frame: Cell<Option<FrameHandle>>,
    listener: Cell<Option<ListenerId>>,
    sim: RefCell<Simulation>,
}

impl MountedField {
    fn is_disposed(&self) -> bool {
        self.state.get() == MountState::Disposed
    }
}

impl Animated for MountedField {
    fn frame_slot(&self) -> &Cell<Option<FrameHandle>> {
        &self.frame
    }

    fn tick(&self, timestamp: f64) -> bool {
        if self.is_disposed() {
            return false;
        }
        let Ok(mut sim) = self.sim.try_borrow_mut() else {
            // Re-entered from inside a surface call; skip this frame
            return true;
        };
        let sim = &mut *sim;
        let dt = sim.time.update(timestamp);
        sim.field.step(dt, &mut *sim.surface);
        true
    }
}

/// Handle to a mounted particle field. Acts as its disposer.
#[must_use = "dropping a FieldHandle disposes the field immediately"]
pub struct FieldHandle {
    mounted: Option<Rc<MountedField>>,
    scheduler: Rc<dyn FrameScheduler>,
    environment: Rc<Environment>,
}

/// Mount a particle field that fills the environment's viewport.
///
/// With `surface == None` (no drawing capability in this host) the returned
/// handle is inert: nothing is scheduled and nothing is subscribed. An invalid
/// `config` is replaced by the defaults; neither case is an error for the caller.
pub fn mount_field(
    environment: &Rc<Environment>,
    scheduler: &Rc<dyn FrameScheduler>,
    surface: Option<Box<dyn DrawSurface>>,
    config: FieldConfig,
) -> FieldHandle {
    let Some(surface) = surface else {
        log::warn!("{}", CapabilityError::SurfaceUnavailable);
        return FieldHandle {
            mounted: None,
            scheduler: scheduler.clone(),
            environment: environment.clone(),
        };
    };

    let config = match config.validate() {
        Ok(()) => config,
        Err(e) => {
            log::warn!("particle field config rejected ({}), using defaults", e);
            FieldConfig::default()
        }
    };

    let viewport = environment.viewport();
    let time = Time::new(scheduler.now()).with_max_delta(config.max_delta);
    let mut sim = Simulation {
        field: ParticleField::new(config, viewport),
        surface,
        time,
    };
    sim.size_surface(viewport);

    let mounted = Rc::new(MountedField {
        state: Cell::new(MountState::Initialized),
        frame: Cell::new(None),
        listener: Cell::new(None),
        sim: RefCell::new(sim),
    });

    let weak = Rc::downgrade(&mounted);
    let listener = environment.subscribe(move |event| {
        let HostEvent::Resized(viewport) = *event else {
            return;
        };
        let Some(mounted) = weak.upgrade() else {
            return;
        };
        if mounted.is_disposed() {
            return;
        }
        let Ok(mut sim) = mounted.sim.try_borrow_mut() else {
            return;
        };
        sim.resize(viewport);
    });
    mounted.listener.set(Some(listener));

    scheduler::schedule(scheduler, &mounted);
    mounted.state.set(MountState::Running);
    log::debug!("particle field mounted at {}x{}", viewport.width, viewport.height);

    FieldHandle {
        mounted: Some(mounted),
        scheduler: scheduler.clone(),
        environment: environment.clone(),
    }
}

impl FieldHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> MountState {
        self.mounted
            .as_ref()
            .map_or(MountState::Unmounted, |m| m.state.get())
    }

    /// True while the frame loop is active.
    pub fn is_running(&self) -> bool {
        self.state() == MountState::Running
    }

    /// Borrow the simulated field, if one was mounted.
    pub fn field(&self) -> Option<Ref<'_, ParticleField>> {
        let mounted = self.mounted.as_ref()?;
        let sim = mounted.sim.try_borrow().ok()?;
        Some(Ref::map(sim, |s| &s.field))
    }

    /// Copy of the current population (empty when unmounted).
    pub fn particles(&self) -> Vec<Particle> {
        self.field().map(|f| f.particles().to_vec()).unwrap_or_default()
    }

    /// Population size (zero when unmounted).
    pub fn particle_count(&self) -> usize {
        self.field().map_or(0, |f| f.len())
    }

    /// Size class of the current population.
    pub fn size_class(&self) -> Option<SizeClass> {
        self.field().map(|f| f.size_class())
    }

    /// Population generation counter (zero when unmounted).
    pub fn generation(&self) -> u64 {
        self.field().map_or(0, |f| f.generation())
    }

    /// Frame timing of the loop.
    pub fn fps(&self) -> f32 {
        self.mounted
            .as_ref()
            .and_then(|m| m.sim.try_borrow().ok().map(|s| s.time.fps()))
            .unwrap_or(0.0)
    }

    /// Stop the loop and detach from the host. Idempotent.
    pub fn dispose(&self) {
        let Some(mounted) = &self.mounted else {
            return;
        };
        if mounted.is_disposed() {
            return;
        }
        mounted.state.set(MountState::Disposed);
        scheduler::unschedule(self.scheduler.as_ref(), mounted.as_ref());
        if let Some(listener) = mounted.listener.take() {
            self.environment.unsubscribe(listener);
        }
        log::debug!("particle field disposed");
    }
}

impl Drop for FieldHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for FieldHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldHandle")
            .field("state", &self.state())
            .field("particles", &self.particle_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::FrameQueue;
    use crate::surface::{DrawCommand, RecordingSurface};

    fn host(width: f32, height: f32) -> (Rc<Environment>, Rc<FrameQueue>) {
        (
            Rc::new(Environment::new(Viewport::new(width, height))),
            Rc::new(FrameQueue::new()),
        )
    }

    #[test]
    fn test_mount_sizes_surface_at_device_resolution() {
        let env = Rc::new(Environment::new(
            Viewport::new(1024.0, 768.0).with_device_pixel_ratio(2.0),
        ));
        let frames: Rc<dyn FrameScheduler> = Rc::new(FrameQueue::new());
        let surface = RecordingSurface::new();

        let handle = mount_field(&env, &frames, Some(Box::new(surface.clone())), FieldConfig::default());

        assert_eq!(handle.state(), MountState::Running);
        assert_eq!(
            surface.commands(),
            vec![
                DrawCommand::Resize { width: 2048, height: 1536 },
                DrawCommand::Transform { scale: 2.0 },
            ]
        );
    }

    #[test]
    fn test_resize_listener_regenerates_population() {
        let (env, frames) = host(1024.0, 768.0);
        let scheduler: Rc<dyn FrameScheduler> = frames.clone();
        let surface = RecordingSurface::new();
        let handle = mount_field(&env, &scheduler, Some(Box::new(surface.clone())), FieldConfig::default());
        let generation = handle.generation();
        surface.take();

        env.resize(Viewport::new(320.0, 480.0));

        assert_eq!(handle.generation(), generation + 1);
        assert_eq!(handle.size_class(), Some(SizeClass::Small));
        assert_eq!(handle.particle_count(), 140);
        assert_eq!(surface.commands()[0], DrawCommand::Resize { width: 320, height: 480 });
        assert!(handle.is_running());
    }

    #[test]
    fn test_frame_updates_then_renders() {
        let (env, frames) = host(1024.0, 768.0);
        let surface = RecordingSurface::new();
        let handle = mount_field(
            &env,
            &(frames.clone() as Rc<dyn FrameScheduler>),
            Some(Box::new(surface.clone())),
            FieldConfig::default(),
        );
        surface.take();

        let before = handle.particles();
        frames.advance(16.0);
        let after = handle.particles();

        assert_ne!(before[0].phase, after[0].phase);
        assert_eq!(surface.last_frame().len(), 240);
        assert_eq!(frames.pending(), 1);
    }

    #[test]
    fn test_no_surface_is_inert() {
        let (env, frames) = host(800.0, 600.0);
        let handle = mount_field(&env, &(frames.clone() as Rc<dyn FrameScheduler>), None, FieldConfig::default());

        assert_eq!(handle.state(), MountState::Unmounted);
        assert_eq!(handle.particle_count(), 0);
        assert!(frames.is_idle());
        assert_eq!(env.listener_count(), 0);
        handle.dispose();
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let (env, frames) = host(1024.0, 768.0);
        let bad = FieldConfig::default().with_counts(1, 1).with_max_delta(-1.0);
        let handle = mount_field(
            &env,
            &(frames as Rc<dyn FrameScheduler>),
            Some(Box::new(RecordingSurface::new())),
            bad,
        );
        assert_eq!(handle.particle_count(), 240);
    }

    #[test]
    fn test_dispose_is_idempotent_and_detaches() {
        let (env, frames) = host(800.0, 600.0);
        let handle = mount_field(
            &env,
            &(frames.clone() as Rc<dyn FrameScheduler>),
            Some(Box::new(RecordingSurface::new())),
            FieldConfig::default(),
        );
        assert_eq!(env.listener_count(), 1);

        handle.dispose();
        handle.dispose();

        assert_eq!(handle.state(), MountState::Disposed);
        assert_eq!(env.listener_count(), 0);
        assert!(frames.is_idle());
    }

    #[test]
    fn test_drop_disposes() {
        let (env, frames) = host(800.0, 600.0);
        {
            let _handle = mount_field(
                &env,
                &(frames.clone() as Rc<dyn FrameScheduler>),
                Some(Box::new(RecordingSurface::new())),
                FieldConfig::default(),
            );
            assert_eq!(frames.pending(), 1);
        }
        assert!(frames.is_idle());
        assert_eq!(env.listener_count(), 0);
    }
}

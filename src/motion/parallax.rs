//! Layered parallax driven by scroll position or pointer movement.
//!
//! A parallax instance owns an ordered list of [`ParallaxLayer`]s. Earlier
//! layers sit closer to the viewer and must move more, so attenuations have to
//! strictly decrease with layer index; [`attach_parallax`] rejects anything
//! else.
//!
//! # Sources
//!
//! - [`ParallaxSource::Scroll`]: each layer's vertical translate is set
//!   directly from how far its measured element sits from the viewport's
//!   vertical center. Recomputed on scroll and resize, at most once per frame.
//! - [`ParallaxSource::Pointer`]: pointer deltas accumulate into a force that
//!   decays every frame; layers drift by the force scaled by their
//!   attenuation. The loop stops once the force is negligible and restarts on
//!   the next pointer movement.
//!
//! ```ignore
//! let layers = vec![
//!     ParallaxLayer::new(front, 1.0),
//!     ParallaxLayer::new(back, 0.4),
//! ];
//! let handle = attach_parallax(&env, &document, &frames, layers, ParallaxSource::pointer())?;
//! ```

use super::document::{Document, ElementId};
use crate::error::ConfigError;
use crate::scheduler::{self, Animated, FrameHandle, FrameScheduler};
use crate::viewport::{Environment, HostEvent, ListenerId};
use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ========== Configuration ==========

/// One element moved by a parallax instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallaxLayer {
    /// Element whose translate is written.
    pub target: ElementId,
    /// Element whose position is measured in scroll mode. Defaults to `target`.
    pub measure: Option<ElementId>,
    /// How strongly this layer follows the source, usually in `(0, 1]`.
    pub attenuation: f32,
}

impl ParallaxLayer {
    /// Layer that measures and moves `target`.
    pub fn new(target: ElementId, attenuation: f32) -> Self {
        Self {
            target,
            measure: None,
            attenuation,
        }
    }

    /// Measure a different element than the one being moved, e.g. an outer
    /// tile whose inner content is translated.
    pub fn measured_by(mut self, element: ElementId) -> Self {
        self.measure = Some(element);
        self
    }

    fn measured(&self) -> ElementId {
        self.measure.unwrap_or(self.target)
    }
}

/// Scroll-mode tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollParallax {
    /// Range each layer's speed factor is drawn from, once, at attach time.
    pub speed_range: (f32, f32),
    /// Constant factor applied to every offset.
    pub damping: f32,
    /// Seed for the speed factors. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for ScrollParallax {
    fn default() -> Self {
        Self {
            speed_range: (0.2, 0.8),
            damping: 0.15,
            seed: None,
        }
    }
}

impl ScrollParallax {
    /// Set the speed factor range.
    pub fn with_speed_range(mut self, min: f32, max: f32) -> Self {
        self.speed_range = (min, max);
        self
    }

    /// Set the damping factor.
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// Draw speed factors from a fixed seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = self.speed_range;
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(ConfigError::InvalidRange {
                field: "speed_range",
                min,
                max,
            });
        }
        if !self.damping.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "damping",
                value: self.damping,
            });
        }
        Ok(())
    }
}

/// Pointer-mode tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerParallax {
    /// Fraction of the force removed every frame, in `(0, 1]`.
    pub ease: f32,
    /// Force magnitude below which the loop stops.
    pub epsilon: f32,
    /// Multiplier applied to incoming pointer deltas.
    pub strength: f32,
}

impl Default for PointerParallax {
    fn default() -> Self {
        Self {
            ease: 0.1,
            epsilon: 0.01,
            strength: 1.0,
        }
    }
}

impl PointerParallax {
    /// Set the per-frame decay fraction.
    pub fn with_ease(mut self, ease: f32) -> Self {
        self.ease = ease;
        self
    }

    /// Set the stop threshold.
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the pointer delta multiplier.
    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ease > 0.0 && self.ease <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "ease",
                value: self.ease,
            });
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(ConfigError::OutOfRange {
                field: "epsilon",
                value: self.epsilon,
            });
        }
        if !self.strength.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "strength",
                value: self.strength,
            });
        }
        Ok(())
    }
}

/// What drives a parallax instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParallaxSource {
    /// Follow the scroll position.
    Scroll(ScrollParallax),
    /// Follow pointer movement.
    Pointer(PointerParallax),
}

impl ParallaxSource {
    /// Scroll source with default tuning.
    pub fn scroll() -> Self {
        ParallaxSource::Scroll(ScrollParallax::default())
    }

    /// Pointer source with default tuning.
    pub fn pointer() -> Self {
        ParallaxSource::Pointer(PointerParallax::default())
    }

    /// Check the source's tuning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ParallaxSource::Scroll(scroll) => scroll.validate(),
            ParallaxSource::Pointer(pointer) => pointer.validate(),
        }
    }
}

/// Check that attenuations are finite and strictly decreasing.
pub fn validate_layers(layers: &[ParallaxLayer]) -> Result<(), ConfigError> {
    for (index, layer) in layers.iter().enumerate() {
        if !layer.attenuation.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "attenuation",
                value: layer.attenuation,
            });
        }
        if index > 0 && layer.attenuation >= layers[index - 1].attenuation {
            return Err(ConfigError::AttenuationOrder { index });
        }
    }
    Ok(())
}

// ========== Motion state ==========

/// Residual pointer velocity shared by all layers of one instance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionState {
    /// Current force, in CSS pixels per frame.
    pub force: Vec2,
}

impl MotionState {
    /// Add an impulse.
    pub fn push(&mut self, impulse: Vec2) {
        self.force += impulse;
    }

    /// Decay the force by `ease`. Returns `false` and zeroes the force once
    /// its magnitude drops below `epsilon` or stops being finite.
    pub fn decay(&mut self, ease: f32, epsilon: f32) -> bool {
        self.force *= 1.0 - ease;
        if !self.force.is_finite() || self.force.length() < epsilon {
            self.force = Vec2::ZERO;
            return false;
        }
        true
    }
}

// ========== Runtime ==========

struct ScrollLayer {
    layer: ParallaxLayer,
    speed: f32,
}

enum Driver {
    Scroll {
        layers: Vec<ScrollLayer>,
        damping: f32,
    },
    Pointer {
        layers: Vec<ParallaxLayer>,
        offsets: Vec<Vec2>,
        motion: MotionState,
        tuning: PointerParallax,
    },
}

struct ParallaxState {
    document: Rc<dyn Document>,
    environment: Rc<Environment>,
    driver: RefCell<Driver>,
    frame: Cell<Option<FrameHandle>>,
    listener: Cell<Option<ListenerId>>,
    disposed: Cell<bool>,
}

impl ParallaxState {
    fn update_scroll(&self, layers: &[ScrollLayer], damping: f32) {
        let half_height = self.environment.viewport().height * 0.5;
        for entry in layers {
            let Some(rect) = self.document.bounding_rect(entry.layer.measured()) else {
                continue;
            };
            let distance = rect.center().y - half_height;
            let offset = distance * entry.speed * damping * entry.layer.attenuation;
            self.document
                .set_translate(entry.layer.target, Vec2::new(0.0, offset));
        }
    }

    fn on_event(&self, event: &HostEvent) -> bool {
        let mut driver = self.driver.borrow_mut();
        match (&mut *driver, event) {
            (Driver::Scroll { .. }, HostEvent::Scrolled { .. } | HostEvent::Resized(_)) => true,
            (Driver::Pointer { motion, tuning, .. }, HostEvent::PointerMoved { delta }) => {
                let impulse = *delta * tuning.strength;
                if !impulse.is_finite() {
                    log::debug!("ignoring non-finite pointer delta {:?}", delta);
                    return false;
                }
                motion.push(impulse);
                true
            }
            _ => false,
        }
    }
}

impl Animated for ParallaxState {
    fn frame_slot(&self) -> &Cell<Option<FrameHandle>> {
        &self.frame
    }

    fn tick(&self, _timestamp: f64) -> bool {
        if self.disposed.get() {
            return false;
        }
        let Ok(mut driver) = self.driver.try_borrow_mut() else {
            return true;
        };
        match &mut *driver {
            Driver::Scroll { layers, damping } => {
                self.update_scroll(layers, *damping);
                false
            }
            Driver::Pointer {
                layers,
                offsets,
                motion,
                tuning,
            } => {
                let running = motion.decay(tuning.ease, tuning.epsilon);
                if running {
                    for (layer, offset) in layers.iter().zip(offsets.iter_mut()) {
                        *offset += motion.force * layer.attenuation;
                        self.document.set_translate(layer.target, *offset);
                    }
                }
                running
            }
        }
    }
}

/// Handle to an attached parallax instance.
#[must_use = "dropping a ParallaxHandle detaches the parallax effect"]
pub struct ParallaxHandle {
    state: Rc<ParallaxState>,
    scheduler: Rc<dyn FrameScheduler>,
}

/// Attach a parallax effect to `layers`.
///
/// Scroll mode positions every layer once immediately. Fails when the layer
/// attenuations are not strictly decreasing or the source tuning is invalid.
pub fn attach_parallax(
    environment: &Rc<Environment>,
    document: &Rc<dyn Document>,
    scheduler: &Rc<dyn FrameScheduler>,
    layers: Vec<ParallaxLayer>,
    source: ParallaxSource,
) -> Result<ParallaxHandle, ConfigError> {
    validate_layers(&layers)?;
    source.validate()?;

    let layers: Vec<ParallaxLayer> = layers
        .into_iter()
        .filter(|layer| {
            let attached = document.contains(layer.target) && document.contains(layer.measured());
            if !attached {
                log::debug!("ignoring parallax layer for detached element {:?}", layer.target);
            }
            attached
        })
        .collect();

    let driver = match source {
        ParallaxSource::Scroll(scroll) => {
            let mut rng = match scroll.seed {
                Some(seed) => SmallRng::seed_from_u64(seed),
                None => SmallRng::from_entropy(),
            };
            let (min, max) = scroll.speed_range;
            let layers = layers
                .into_iter()
                .map(|layer| ScrollLayer {
                    layer,
                    speed: if max > min { rng.gen_range(min..max) } else { min },
                })
                .collect();
            Driver::Scroll {
                layers,
                damping: scroll.damping,
            }
        }
        ParallaxSource::Pointer(tuning) => Driver::Pointer {
            offsets: vec![Vec2::ZERO; layers.len()],
            layers,
            motion: MotionState::default(),
            tuning,
        },
    };

    let state = Rc::new(ParallaxState {
        document: document.clone(),
        environment: environment.clone(),
        driver: RefCell::new(driver),
        frame: Cell::new(None),
        listener: Cell::new(None),
        disposed: Cell::new(false),
    });

    if let Driver::Scroll { layers, damping } = &*state.driver.borrow() {
        state.update_scroll(layers, *damping);
    }

    let weak = Rc::downgrade(&state);
    let weak_scheduler = Rc::downgrade(scheduler);
    let listener = environment.subscribe(move |event| {
        let (Some(state), Some(scheduler)) = (weak.upgrade(), weak_scheduler.upgrade()) else {
            return;
        };
        if state.disposed.get() {
            return;
        }
        if state.on_event(event) {
            scheduler::schedule(&scheduler, &state);
        }
    });
    state.listener.set(Some(listener));

    Ok(ParallaxHandle {
        state,
        scheduler: scheduler.clone(),
    })
}

impl ParallaxHandle {
    /// Current pointer force. Zero in scroll mode.
    pub fn force(&self) -> Vec2 {
        match &*self.state.driver.borrow() {
            Driver::Pointer { motion, .. } => motion.force,
            Driver::Scroll { .. } => Vec2::ZERO,
        }
    }

    /// True while a frame is pending.
    pub fn is_running(&self) -> bool {
        self.state.frame.get().is_some()
    }

    /// Number of live layers (detached elements are dropped at attach time).
    pub fn layer_count(&self) -> usize {
        match &*self.state.driver.borrow() {
            Driver::Scroll { layers, .. } => layers.len(),
            Driver::Pointer { layers, .. } => layers.len(),
        }
    }

    /// Accumulated pointer offsets per layer. Empty in scroll mode.
    pub fn layer_offsets(&self) -> Vec<Vec2> {
        match &*self.state.driver.borrow() {
            Driver::Pointer { offsets, .. } => offsets.clone(),
            Driver::Scroll { .. } => Vec::new(),
        }
    }

    /// Per-layer scroll speed factors. Empty in pointer mode.
    pub fn speeds(&self) -> Vec<f32> {
        match &*self.state.driver.borrow() {
            Driver::Scroll { layers, .. } => layers.iter().map(|l| l.speed).collect(),
            Driver::Pointer { .. } => Vec::new(),
        }
    }

    /// Detach from the environment and stop any pending frame. Idempotent.
    pub fn dispose(&self) {
        if self.state.disposed.replace(true) {
            return;
        }
        scheduler::unschedule(self.scheduler.as_ref(), self.state.as_ref());
        if let Some(listener) = self.state.listener.take() {
            self.state.environment.unsubscribe(listener);
        }
    }
}

impl Drop for ParallaxHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ParallaxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallaxHandle")
            .field("layers", &self.layer_count())
            .field("force", &self.force())
            .field("running", &self.is_running())
            .finish()
    }
}

//! One-shot reveal of elements as they scroll into view.
//!
//! [`observe_reveal`] puts an element into its hidden state (transparent,
//! pushed down by a few pixels) and, the first time enough of it is visible,
//! brings it back to full opacity at its rest position. After that the element
//! is no longer observed, so scrolling it out and back in does nothing.
//!
//! Without a visibility observer the element is revealed on the spot: content
//! must never stay hidden because a capability is missing.

use super::document::{Document, ElementId};
use super::observer::{ObservationId, RootMargin, VisibilityObserver};
use super::tween::{Easing, Tween};
use crate::error::{CapabilityError, ConfigError};
use crate::scheduler::{self, Animated, FrameHandle, FrameScheduler};
use crate::time::Time;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Animated change from hidden to revealed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transition {
    /// Length of the transition in seconds.
    pub duration: f32,
    /// Easing applied to both opacity and offset.
    pub easing: Easing,
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            duration: 0.6,
            easing: Easing::Ease,
        }
    }
}

/// Options for [`observe_reveal`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealOptions {
    /// Visible fraction that triggers the reveal, 0 to 1.
    pub threshold: f32,
    /// Margin applied to the viewport before measuring visibility.
    pub root_margin: RootMargin,
    /// Vertical offset of the hidden state, in CSS pixels.
    pub hidden_offset: f32,
    /// Animate the reveal instead of snapping to the final state.
    pub transition: Option<Transition>,
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            root_margin: RootMargin::ZERO,
            hidden_offset: 20.0,
            transition: None,
        }
    }
}

impl RevealOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trigger threshold. Values outside `[0, 1]` are rejected.
    pub fn with_threshold(mut self, threshold: f32) -> Result<Self, ConfigError> {
        self.threshold = threshold;
        self.validate()?;
        Ok(self)
    }

    /// Set the root margin from CSS shorthand such as `"0px 0px -10% 0px"`.
    pub fn with_root_margin(mut self, margin: &str) -> Result<Self, ConfigError> {
        self.root_margin = RootMargin::parse(margin)?;
        Ok(self)
    }

    /// Set the hidden-state vertical offset.
    pub fn with_hidden_offset(mut self, offset: f32) -> Self {
        self.hidden_offset = offset;
        self
    }

    /// Animate the reveal over `duration` seconds.
    pub fn with_transition(mut self, duration: f32, easing: Easing) -> Self {
        self.transition = Some(Transition { duration, easing });
        self
    }

    /// Check that the threshold lies in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::OutOfRange {
                field: "threshold",
                value: self.threshold,
            });
        }
        if !self.hidden_offset.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "hidden_offset",
                value: self.hidden_offset,
            });
        }
        Ok(())
    }
}

struct RevealAnimation {
    tween: Tween,
    time: Time,
}

struct RevealState {
    element: ElementId,
    hidden_offset: f32,
    transition: Option<Transition>,
    document: Rc<dyn Document>,
    observer: Option<Rc<dyn VisibilityObserver>>,
    scheduler: Rc<dyn FrameScheduler>,
    observation: Cell<Option<ObservationId>>,
    revealed: Cell<bool>,
    disposed: Cell<bool>,
    frame: Cell<Option<FrameHandle>>,
    animation: RefCell<Option<RevealAnimation>>,
}

impl RevealState {
    fn apply(&self, progress: f32) {
        self.document.set_opacity(self.element, progress);
        self.document
            .set_translate(self.element, Vec2::new(0.0, self.hidden_offset * (1.0 - progress)));
    }

    fn stop_observing(&self) {
        if let (Some(observer), Some(id)) = (&self.observer, self.observation.take()) {
            observer.unobserve(id);
        }
    }

    fn reveal(self: &Rc<Self>) {
        if self.revealed.get() || self.disposed.get() {
            return;
        }
        self.revealed.set(true);
        self.stop_observing();

        match self.transition {
            Some(transition) if transition.duration > 0.0 => {
                *self.animation.borrow_mut() = Some(RevealAnimation {
                    tween: Tween::new(0.0, 1.0, transition.duration, transition.easing),
                    time: Time::new(self.scheduler.now()).with_max_delta(f32::MAX),
                });
                scheduler::schedule(&self.scheduler, self);
            }
            _ => self.apply(1.0),
        }
        log::debug!("revealed {:?}", self.element);
    }
}

impl Animated for RevealState {
    fn frame_slot(&self) -> &Cell<Option<FrameHandle>> {
        &self.frame
    }

    fn tick(&self, timestamp: f64) -> bool {
        if self.disposed.get() {
            return false;
        }
        let progress = {
            let mut animation = self.animation.borrow_mut();
            let Some(animation) = animation.as_mut() else {
                return false;
            };
            let dt = animation.time.update(timestamp);
            animation.tween.update(dt);
            if animation.tween.is_complete() { 1.0 } else { animation.tween.value() }
        };
        self.apply(progress);
        if progress >= 1.0 {
            self.animation.borrow_mut().take();
            return false;
        }
        true
    }
}

/// Handle to one reveal registration. Disposing stops observation; an
/// element that was never revealed keeps its hidden style.
#[must_use = "dropping a RevealHandle stops observing the element"]
pub struct RevealHandle {
    state: Option<Rc<RevealState>>,
}

/// Register `element` for a one-shot reveal.
///
/// Invalid options fall back to the defaults. Detached elements are ignored
/// and yield an inert handle.
pub fn observe_reveal(
    document: &Rc<dyn Document>,
    observer: Option<&Rc<dyn VisibilityObserver>>,
    scheduler: &Rc<dyn FrameScheduler>,
    element: ElementId,
    options: RevealOptions,
) -> RevealHandle {
    if !document.contains(element) {
        log::debug!("ignoring reveal for detached element {:?}", element);
        return RevealHandle { state: None };
    }
    let options = match options.validate() {
        Ok(()) => options,
        Err(e) => {
            log::warn!("reveal options rejected ({}), using defaults", e);
            RevealOptions::default()
        }
    };

    let state = Rc::new(RevealState {
        element,
        hidden_offset: options.hidden_offset,
        transition: options.transition,
        document: document.clone(),
        observer: observer.cloned(),
        scheduler: scheduler.clone(),
        observation: Cell::new(None),
        revealed: Cell::new(false),
        disposed: Cell::new(false),
        frame: Cell::new(None),
        animation: RefCell::new(None),
    });
    state.apply(0.0);

    let Some(observer) = observer else {
        log::warn!("{}", CapabilityError::ObserverUnavailable);
        state.apply(1.0);
        state.revealed.set(true);
        return RevealHandle { state: Some(state) };
    };

    let weak: Weak<RevealState> = Rc::downgrade(&state);
    let id = observer.observe(
        element,
        options.threshold,
        options.root_margin,
        Rc::new(move |entry| {
            if !entry.is_intersecting {
                return;
            }
            if let Some(state) = weak.upgrade() {
                state.reveal();
            }
        }),
    );
    if id.is_none() {
        // Declined by the observer; nothing would ever reveal it
        log::debug!("observer declined {:?}, revealing immediately", element);
        state.apply(1.0);
        state.revealed.set(true);
    }
    state.observation.set(id);

    RevealHandle { state: Some(state) }
}

impl RevealHandle {
    /// True once the element has been revealed (or the transition started).
    pub fn is_revealed(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.revealed.get())
    }

    /// True while the element is still waiting to be revealed.
    pub fn is_observing(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.observation.get().is_some())
    }

    /// Stop observing and cancel any running transition. Idempotent.
    pub fn dispose(&self) {
        let Some(state) = &self.state else {
            return;
        };
        if state.disposed.replace(true) {
            return;
        }
        state.stop_observing();
        scheduler::unschedule(state.scheduler.as_ref(), state.as_ref());
        state.animation.borrow_mut().take();
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for RevealHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealHandle")
            .field("element", &self.state.as_ref().map(|s| s.element))
            .field("revealed", &self.is_revealed())
            .finish()
    }
}

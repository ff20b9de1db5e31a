//! Endless yoyo drift of an element around its rest position.

use super::document::{Document, ElementId};
use super::tween::Easing;
use crate::error::ConfigError;
use crate::scheduler::{self, Animated, FrameHandle, FrameScheduler};
use crate::time::Time;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Options for [`attach_float`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatOptions {
    /// Furthest displacement from rest, in CSS pixels.
    pub amplitude: Vec2,
    /// Seconds to travel from rest to full amplitude (one leg of the yoyo).
    pub period: f32,
    /// Seconds to wait before moving.
    pub delay: f32,
}

impl Default for FloatOptions {
    fn default() -> Self {
        Self {
            amplitude: Vec2::new(8.0, 8.0),
            period: 3.0,
            delay: 0.0,
        }
    }
}

impl FloatOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the amplitude.
    pub fn with_amplitude(mut self, amplitude: Vec2) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Set one leg's duration in seconds.
    pub fn with_period(mut self, period: f32) -> Self {
        self.period = period;
        self
    }

    /// Set the start delay in seconds.
    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    /// Options staggered by `index` the way a row of floating items is set up:
    /// amplitudes cycle through 6 to 10 px, legs through 2 to 4 s, and each item
    /// starts 0.15 s after the previous one.
    pub fn staggered(index: usize) -> Self {
        Self {
            amplitude: Vec2::new(6.0 + (index % 3) as f32 * 2.0, 8.0 + (index % 2) as f32 * 2.0),
            period: 2.0 + (index % 3) as f32,
            delay: index as f32 * 0.15,
        }
    }

    /// Check that the period is positive and the delay non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.period > 0.0 && self.period.is_finite()) {
            return Err(ConfigError::OutOfRange {
                field: "period",
                value: self.period,
            });
        }
        if !(self.delay >= 0.0 && self.delay.is_finite()) {
            return Err(ConfigError::OutOfRange {
                field: "delay",
                value: self.delay,
            });
        }
        if !self.amplitude.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "amplitude",
                value: self.amplitude.length(),
            });
        }
        Ok(())
    }

    /// Displacement `elapsed` seconds after attaching.
    pub fn offset_at(&self, elapsed: f32) -> Vec2 {
        let t = elapsed - self.delay;
        if t <= 0.0 || self.period <= 0.0 {
            return Vec2::ZERO;
        }
        let legs = t / self.period;
        let leg = legs.floor();
        let within = legs - leg;
        // Even legs go out, odd legs come back
        let phase = if leg as u64 % 2 == 0 { within } else { 1.0 - within };
        self.amplitude * Easing::SineInOut.apply(phase)
    }
}

struct FloatState {
    element: ElementId,
    options: FloatOptions,
    document: Rc<dyn Document>,
    time: RefCell<Time>,
    frame: Cell<Option<FrameHandle>>,
    disposed: Cell<bool>,
}

impl Animated for FloatState {
    fn frame_slot(&self) -> &Cell<Option<FrameHandle>> {
        &self.frame
    }

    fn tick(&self, timestamp: f64) -> bool {
        if self.disposed.get() {
            return false;
        }
        let elapsed = {
            let mut time = self.time.borrow_mut();
            time.update(timestamp);
            time.elapsed()
        };
        if !self.document.contains(self.element) {
            log::debug!("float target {:?} detached, stopping", self.element);
            return false;
        }
        self.document
            .set_translate(self.element, self.options.offset_at(elapsed));
        true
    }
}

/// Handle to a running float loop.
#[must_use = "dropping a FloatHandle stops the float loop"]
pub struct FloatHandle {
    state: Option<Rc<FloatState>>,
    scheduler: Rc<dyn FrameScheduler>,
}

/// Start floating `element`. Runs every frame until disposed.
///
/// Invalid options fall back to the defaults; detached elements yield an
/// inert handle.
pub fn attach_float(
    document: &Rc<dyn Document>,
    scheduler: &Rc<dyn FrameScheduler>,
    element: ElementId,
    options: FloatOptions,
) -> FloatHandle {
    if !document.contains(element) {
        log::debug!("ignoring float for detached element {:?}", element);
        return FloatHandle {
            state: None,
            scheduler: scheduler.clone(),
        };
    }
    let options = match options.validate() {
        Ok(()) => options,
        Err(e) => {
            log::warn!("float options rejected ({}), using defaults", e);
            FloatOptions::default()
        }
    };

    let state = Rc::new(FloatState {
        element,
        options,
        document: document.clone(),
        // Elapsed time, not frame delta, drives the curve, so no clamp
        time: RefCell::new(Time::new(scheduler.now()).with_max_delta(f32::MAX)),
        frame: Cell::new(None),
        disposed: Cell::new(false),
    });
    scheduler::schedule(scheduler, &state);

    FloatHandle {
        state: Some(state),
        scheduler: scheduler.clone(),
    }
}

impl FloatHandle {
    /// True while the loop is scheduled.
    pub fn is_running(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.frame.get().is_some())
    }

    /// Stop the loop. The element keeps its last translate. Idempotent.
    pub fn dispose(&self) {
        let Some(state) = &self.state else {
            return;
        };
        if state.disposed.replace(true) {
            return;
        }
        scheduler::unschedule(self.scheduler.as_ref(), state.as_ref());
    }
}

impl Drop for FloatHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for FloatHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloatHandle")
            .field("element", &self.state.as_ref().map(|s| s.element))
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::document::MemoryDocument;
    use crate::scheduler::FrameQueue;
    use crate::viewport::Rect;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_offset_is_periodic() {
        let options = FloatOptions::new()
            .with_amplitude(Vec2::new(10.0, 4.0))
            .with_period(2.0);
        assert!(close(options.offset_at(0.0), Vec2::ZERO));
        assert!(close(options.offset_at(1.0), Vec2::new(5.0, 2.0)));
        assert!(close(options.offset_at(2.0), Vec2::new(10.0, 4.0)));
        assert!(close(options.offset_at(3.0), Vec2::new(5.0, 2.0)));
        assert!(close(options.offset_at(4.0), Vec2::ZERO));
        assert!(close(options.offset_at(1.3), options.offset_at(5.3)));
    }

    #[test]
    fn test_delay_holds_rest_position() {
        let options = FloatOptions::new().with_delay(0.5);
        assert_eq!(options.offset_at(0.4), Vec2::ZERO);
        assert!(options.offset_at(1.0).length() > 0.0);
    }

    #[test]
    fn test_staggered_options() {
        let first = FloatOptions::staggered(0);
        assert_eq!(first.amplitude, Vec2::new(6.0, 8.0));
        assert_eq!(first.period, 2.0);
        let fifth = FloatOptions::staggered(4);
        assert_eq!(fifth.amplitude, Vec2::new(8.0, 8.0));
        assert_eq!(fifth.period, 3.0);
        assert!((fifth.delay - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_period_is_rejected() {
        assert!(FloatOptions::new().with_period(0.0).validate().is_err());
        assert!(FloatOptions::new().with_delay(-1.0).validate().is_err());
    }

    #[test]
    fn test_loop_runs_until_disposed() {
        let doc = Rc::new(MemoryDocument::new());
        let frames = Rc::new(FrameQueue::new());
        let el = doc.create_element(Rect::default());
        let document: Rc<dyn Document> = doc.clone();
        let scheduler: Rc<dyn FrameScheduler> = frames.clone();
        let options = FloatOptions::new().with_amplitude(Vec2::new(0.0, 10.0)).with_period(1.0);

        let handle = attach_float(&document, &scheduler, el, options);
        frames.run_frames(50, 10.0); // 0.5 s in
        assert!(handle.is_running());
        assert!((doc.style(el).unwrap().translate.y - 5.0).abs() < 1e-3);

        handle.dispose();
        let writes = doc.write_count(el);
        frames.run_frames(5, 10.0);
        assert_eq!(doc.write_count(el), writes);
        assert!(!handle.is_running());
    }
}

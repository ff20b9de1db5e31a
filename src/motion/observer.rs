//! Element visibility observation.
//!
//! A [`VisibilityObserver`] reports when an element's visible fraction of the
//! viewport crosses a threshold. [`PollingObserver`] is the implementation used
//! here: it re-reads bounding rects after every scroll or resize, batched to at
//! most one check per frame, and compares them against the viewport grown or
//! shrunk by a [`RootMargin`].
//!
//! ```ignore
//! let observer = PollingObserver::new(env.clone(), document.clone(), frames.clone());
//! let id = observer.observe(element, 0.1, RootMargin::parse("0px 0px -10% 0px")?, Rc::new(|entry| {
//!     println!("{:?} visible: {}", entry.element, entry.is_intersecting);
//! }));
//! ```

use super::document::{Document, ElementId};
use crate::error::ConfigError;
use crate::scheduler::{self, Animated, FrameHandle, FrameScheduler};
use crate::viewport::{Environment, HostEvent, ListenerId, Rect, Viewport};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

// ========== Root margin ==========

/// One side of a root margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginLength {
    /// Absolute CSS pixels.
    Px(f32),
    /// Percentage of the viewport dimension along that side's axis.
    Percent(f32),
}

impl MarginLength {
    fn parse(token: &str) -> Option<Self> {
        let number = |s: &str| s.trim().parse::<f32>().ok().filter(|v| v.is_finite());
        if let Some(value) = token.strip_suffix("px") {
            number(value).map(MarginLength::Px)
        } else if let Some(value) = token.strip_suffix('%') {
            number(value).map(MarginLength::Percent)
        } else {
            // Unitless zero is the only bare number CSS allows
            number(token).filter(|v| *v == 0.0).map(MarginLength::Px)
        }
    }

    /// Length in pixels given the viewport extent along this axis.
    pub fn resolve(self, extent: f32) -> f32 {
        match self {
            MarginLength::Px(px) => px,
            MarginLength::Percent(pct) => extent * pct / 100.0,
        }
    }
}

impl fmt::Display for MarginLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginLength::Px(v) => write!(f, "{}px", v),
            MarginLength::Percent(v) => write!(f, "{}%", v),
        }
    }
}

/// Margin applied to the viewport before intersecting, in CSS shorthand order
/// (top, right, bottom, left). Negative values shrink the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootMargin {
    /// Top side.
    pub top: MarginLength,
    /// Right side.
    pub right: MarginLength,
    /// Bottom side.
    pub bottom: MarginLength,
    /// Left side.
    pub left: MarginLength,
}

impl RootMargin {
    /// No margin.
    pub const ZERO: RootMargin = RootMargin {
        top: MarginLength::Px(0.0),
        right: MarginLength::Px(0.0),
        bottom: MarginLength::Px(0.0),
        left: MarginLength::Px(0.0),
    };

    /// Parses CSS margin shorthand: one to four whitespace-separated lengths,
    /// each in `px` or `%`.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let err = || ConfigError::RootMargin(input.to_string());
        let sides = input
            .split_whitespace()
            .map(MarginLength::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(err)?;

        let (top, right, bottom, left) = match sides.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => return Err(err()),
        };
        Ok(Self { top, right, bottom, left })
    }

    /// The viewport rect grown by this margin.
    pub fn apply(&self, viewport: &Viewport) -> Rect {
        let (w, h) = (viewport.width, viewport.height);
        let top = self.top.resolve(h);
        let right = self.right.resolve(w);
        let bottom = self.bottom.resolve(h);
        let left = self.left.resolve(w);
        Rect::new(-left, -top, w + left + right, h + top + bottom)
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

impl std::str::FromStr for RootMargin {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RootMargin {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RootMargin> for String {
    fn from(margin: RootMargin) -> Self {
        margin.to_string()
    }
}

// ========== Intersection ==========

/// Visible fraction of `target` inside `root`.
///
/// A zero-area target that touches the root counts as fully visible.
pub fn intersection_ratio(target: &Rect, root: &Rect) -> f32 {
    let Some(overlap) = target.intersection(root) else {
        return 0.0;
    };
    let area = target.area();
    if area <= 0.0 {
        return 1.0;
    }
    (overlap.area() / area).clamp(0.0, 1.0)
}

/// One visibility report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    /// The observed element.
    pub element: ElementId,
    /// Visible fraction of the element, 0 to 1.
    pub ratio: f32,
    /// True when the element touches the root and `ratio` meets the
    /// observation's threshold.
    pub is_intersecting: bool,
}

/// Identifies an observation so it can be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationId(u64);

impl ObservationId {
    /// Wrap an observer-specific id. For implementors of [`VisibilityObserver`].
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The wrapped id.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Callback invoked with visibility changes.
pub type VisibilityCallback = Rc<dyn Fn(VisibilityEntry)>;

/// Host capability for watching element visibility.
pub trait VisibilityObserver {
    /// Start watching `element`. The callback receives an initial entry and
    /// then one entry each time the element crosses `threshold`.
    ///
    /// Returns `None` when the element is not attached.
    fn observe(
        &self,
        element: ElementId,
        threshold: f32,
        root_margin: RootMargin,
        callback: VisibilityCallback,
    ) -> Option<ObservationId>;

    /// Stop watching. Unknown ids are ignored.
    fn unobserve(&self, id: ObservationId);
}

// ========== Polling observer ==========

struct Observation {
    id: ObservationId,
    element: ElementId,
    threshold: f32,
    root_margin: RootMargin,
    callback: VisibilityCallback,
    last: Option<bool>,
}

/// Visibility observer that polls bounding rects after scroll and resize.
pub struct PollingObserver {
    environment: Rc<Environment>,
    document: Rc<dyn Document>,
    scheduler: Rc<dyn FrameScheduler>,
    this: Weak<PollingObserver>,
    frame: Cell<Option<FrameHandle>>,
    listener: Cell<Option<ListenerId>>,
    next_id: Cell<u64>,
    observations: RefCell<Vec<Observation>>,
}

impl PollingObserver {
    /// Create an observer that re-checks on every scroll and resize of
    /// `environment`.
    pub fn new(
        environment: Rc<Environment>,
        document: Rc<dyn Document>,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Rc<Self> {
        let observer = Rc::new_cyclic(|this: &Weak<PollingObserver>| PollingObserver {
            environment: environment.clone(),
            document,
            scheduler,
            this: this.clone(),
            frame: Cell::new(None),
            listener: Cell::new(None),
            next_id: Cell::new(0),
            observations: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&observer);
        let listener = environment.subscribe(move |event| {
            if matches!(event, HostEvent::PointerMoved { .. }) {
                return;
            }
            if let Some(observer) = weak.upgrade() {
                observer.request_check();
            }
        });
        observer.listener.set(Some(listener));
        observer
    }

    /// Number of active observations.
    pub fn len(&self) -> usize {
        self.observations.borrow().len()
    }

    /// True when nothing is observed.
    pub fn is_empty(&self) -> bool {
        self.observations.borrow().is_empty()
    }

    /// True while a check is waiting for the next frame.
    pub fn check_pending(&self) -> bool {
        self.frame.get().is_some()
    }

    fn request_check(&self) {
        if self.is_empty() {
            return;
        }
        if let Some(this) = self.this.upgrade() {
            scheduler::schedule(&self.scheduler, &this);
        }
    }

    /// Evaluate every observation now and deliver changed entries.
    pub fn check(&self) {
        let viewport = self.environment.viewport();
        let mut due = Vec::new();
        {
            let mut observations = self.observations.borrow_mut();
            for obs in observations.iter_mut() {
                let Some(rect) = self.document.bounding_rect(obs.element) else {
                    continue;
                };
                let root = obs.root_margin.apply(&viewport);
                let ratio = intersection_ratio(&rect, &root);
                let touching = rect.intersection(&root).is_some();
                let is_intersecting = touching && ratio >= obs.threshold;
                if obs.last == Some(is_intersecting) {
                    continue;
                }
                obs.last = Some(is_intersecting);
                let entry = VisibilityEntry {
                    element: obs.element,
                    ratio,
                    is_intersecting,
                };
                due.push((obs.id, obs.callback.clone(), entry));
            }
        }

        // Callbacks may unobserve themselves or each other
        for (id, callback, entry) in due {
            let live = self.observations.borrow().iter().any(|o| o.id == id);
            if live {
                callback(entry);
            }
        }
    }
}

impl Animated for PollingObserver {
    fn frame_slot(&self) -> &Cell<Option<FrameHandle>> {
        &self.frame
    }

    fn tick(&self, _timestamp: f64) -> bool {
        self.check();
        false
    }
}

impl VisibilityObserver for PollingObserver {
    fn observe(
        &self,
        element: ElementId,
        threshold: f32,
        root_margin: RootMargin,
        callback: VisibilityCallback,
    ) -> Option<ObservationId> {
        if !self.document.contains(element) {
            log::debug!("ignoring observation of detached element {:?}", element);
            return None;
        }
        let id = ObservationId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.observations.borrow_mut().push(Observation {
            id,
            element,
            threshold: if threshold.is_nan() { 0.0 } else { threshold.clamp(0.0, 1.0) },
            root_margin,
            callback,
            last: None,
        });
        // Initial entry arrives on the next frame, after the caller has the id
        self.request_check();
        Some(id)
    }

    fn unobserve(&self, id: ObservationId) {
        self.observations.borrow_mut().retain(|o| o.id != id);
        if self.is_empty() {
            scheduler::unschedule(self.scheduler.as_ref(), self);
        }
    }
}

impl Drop for PollingObserver {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            self.environment.unsubscribe(listener);
        }
        if let Some(handle) = self.frame.take() {
            self.scheduler.cancel_frame(handle);
        }
    }
}

impl fmt::Debug for PollingObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingObserver")
            .field("observations", &self.len())
            .field("check_pending", &self.check_pending())
            .finish()
    }
}

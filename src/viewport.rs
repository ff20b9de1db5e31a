//! Viewport geometry and host environment signals.
//!
//! [`Environment`] is the single place host signals enter the core: viewport
//! resizes, scroll position and pointer movement. Components subscribe to it
//! and read the latest values from it; they never write to it. The embedding
//! host (a window event loop, a browser shim, a test) is the only writer.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Size of the visible area in CSS pixels plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: f32,
    /// Height in CSS pixels.
    pub height: f32,
    /// Physical pixels per CSS pixel.
    pub device_pixel_ratio: f32,
}

impl Viewport {
    /// A viewport at device pixel ratio 1.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: 1.0,
        }
    }

    /// Set the device pixel ratio. Non-positive or non-finite values fall back to 1.
    pub fn with_device_pixel_ratio(mut self, ratio: f32) -> Self {
        self.device_pixel_ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            1.0
        };
        self
    }

    /// Backing store size in physical pixels, `floor(css * ratio)`.
    pub fn backing_size(&self) -> (u32, u32) {
        let w = (self.width.max(0.0) * self.device_pixel_ratio).floor() as u32;
        let h = (self.height.max(0.0) * self.device_pixel_ratio).floor() as u32;
        (w, h)
    }

    /// The viewport as a rectangle anchored at the origin.
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Vertical center in CSS pixels.
    pub fn center_y(&self) -> f32 {
        self.height * 0.5
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width, never negative for a well-formed rect.
    pub width: f32,
    /// Height, never negative for a well-formed rect.
    pub height: f32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Center point.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Area, zero for degenerate rects.
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Same rectangle moved by `offset`.
    pub fn translated(&self, offset: Vec2) -> Rect {
        Rect::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Intersection with `other`, or `None` when they do not touch.
    ///
    /// Rects that share only an edge intersect with zero area, matching how
    /// browsers report edge-adjacent targets.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// A signal from the host environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    /// The viewport changed size or pixel density.
    Resized(Viewport),
    /// The document scrolled to vertical position `y` (CSS pixels).
    Scrolled {
        /// New scroll offset.
        y: f32,
    },
    /// The pointer moved by `delta` CSS pixels since the previous movement.
    PointerMoved {
        /// Movement since the previous pointer event.
        delta: Vec2,
    },
}

/// Identifies an [`Environment`] subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&HostEvent)>;

/// Latest host state plus a listener registry for host events.
pub struct Environment {
    viewport: Cell<Viewport>,
    scroll_y: Cell<f32>,
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
}

impl Environment {
    /// Create an environment with the given initial viewport.
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport: Cell::new(viewport),
            scroll_y: Cell::new(0.0),
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Current viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    /// Current vertical scroll offset.
    pub fn scroll_y(&self) -> f32 {
        self.scroll_y.get()
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Register `listener` for every subsequent host event.
    pub fn subscribe(&self, listener: impl Fn(&HostEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    /// Record a host event and notify listeners.
    ///
    /// Listeners may subscribe or unsubscribe while being notified; the set
    /// notified is the one registered when dispatch started, minus any that
    /// were removed before their turn.
    pub fn dispatch(&self, event: HostEvent) {
        match event {
            HostEvent::Resized(viewport) => self.viewport.set(viewport),
            HostEvent::Scrolled { y } => self.scroll_y.set(y),
            HostEvent::PointerMoved { .. } => {}
        }

        let snapshot: Vec<(ListenerId, Listener)> = self.listeners.borrow().clone();
        for (id, listener) in snapshot {
            let still_registered = self.listeners.borrow().iter().any(|(lid, _)| *lid == id);
            if still_registered {
                listener(&event);
            }
        }
    }

    /// Shorthand for dispatching [`HostEvent::Resized`].
    pub fn resize(&self, viewport: Viewport) {
        self.dispatch(HostEvent::Resized(viewport));
    }

    /// Shorthand for dispatching [`HostEvent::Scrolled`].
    pub fn scroll_to(&self, y: f32) {
        self.dispatch(HostEvent::Scrolled { y });
    }

    /// Shorthand for dispatching [`HostEvent::PointerMoved`].
    pub fn pointer_moved(&self, delta: Vec2) {
        self.dispatch(HostEvent::PointerMoved { delta });
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("viewport", &self.viewport.get())
            .field("scroll_y", &self.scroll_y.get())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_size_floors() {
        let vp = Viewport::new(333.0, 200.0).with_device_pixel_ratio(1.5);
        assert_eq!(vp.backing_size(), (499, 300));
    }

    #[test]
    fn test_bad_pixel_ratio_falls_back() {
        assert_eq!(Viewport::new(10.0, 10.0).with_device_pixel_ratio(0.0).device_pixel_ratio, 1.0);
        assert_eq!(Viewport::new(10.0, 10.0).with_device_pixel_ratio(f32::NAN).device_pixel_ratio, 1.0);
    }

    #[test]
    fn test_intersection() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 80.0, 100.0, 100.0);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Rect::new(50.0, 80.0, 50.0, 20.0));

        let far = Rect::new(200.0, 200.0, 10.0, 10.0);
        assert!(a.intersection(&far).is_none());

        let edge = Rect::new(100.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection(&edge).unwrap().area(), 0.0);
    }

    #[test]
    fn test_dispatch_updates_state_and_notifies() {
        let env = Environment::new(Viewport::new(800.0, 600.0));
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        env.subscribe(move |_| h.set(h.get() + 1));

        env.scroll_to(120.0);
        env.resize(Viewport::new(400.0, 300.0));

        assert_eq!(env.scroll_y(), 120.0);
        assert_eq!(env.viewport().width, 400.0);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_unsubscribe_during_dispatch() {
        let env = Rc::new(Environment::default());
        let second_hits = Rc::new(Cell::new(0));
        let second_id = Rc::new(Cell::new(None));

        let e = env.clone();
        let sid = second_id.clone();
        env.subscribe(move |_| {
            if let Some(id) = sid.get() {
                e.unsubscribe(id);
            }
        });
        let h = second_hits.clone();
        second_id.set(Some(env.subscribe(move |_| h.set(h.get() + 1))));

        env.scroll_to(1.0);
        assert_eq!(second_hits.get(), 0);
        assert_eq!(env.listener_count(), 1);
    }
}

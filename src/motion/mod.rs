//! Viewport-driven motion for page elements.
//!
//! Three effects, all driven through the crate's [`FrameScheduler`]:
//!
//! - [`observe_reveal`]: one-shot fade and slide in when an element becomes visible
//! - [`attach_parallax`]: layered offsets following scroll or pointer movement
//! - [`attach_float`]: a slow endless drift around the rest position
//!
//! Effects talk to the host only through a [`Document`] (element rects and
//! styles), an optional [`VisibilityObserver`] and the [`Environment`] event
//! hub. Every attach function returns a handle that disposes on drop.
//!
//! [`FrameScheduler`]: crate::scheduler::FrameScheduler
//! [`Environment`]: crate::viewport::Environment

pub mod document;
pub mod float;
pub mod observer;
pub mod parallax;
pub mod reveal;
pub mod tween;

pub use document::{Document, ElementId, MemoryDocument, Style};
pub use float::{attach_float, FloatHandle, FloatOptions};
pub use observer::{
    intersection_ratio, MarginLength, ObservationId, PollingObserver, RootMargin, VisibilityCallback,
    VisibilityEntry, VisibilityObserver,
};
pub use parallax::{
    attach_parallax, validate_layers, MotionState, ParallaxHandle, ParallaxLayer, ParallaxSource,
    PointerParallax, ScrollParallax,
};
pub use reveal::{observe_reveal, RevealHandle, RevealOptions, Transition};
pub use tween::{Easing, Tween};

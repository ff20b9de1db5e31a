//! The element model motion effects read from and write to.
//!
//! Effects only need two things from a host document: where an element is on
//! screen right now, and a way to set its opacity and translate. [`Document`]
//! is that seam. [`MemoryDocument`] is a plain in-memory implementation used
//! by tests and by hosts that lay elements out themselves.

use crate::viewport::Rect;
use glam::Vec2;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Opaque identifier of a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// The visual properties motion effects control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    /// Opacity, 0 to 1.
    pub opacity: f32,
    /// Translation from the element's layout position, in CSS pixels.
    pub translate: Vec2,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            translate: Vec2::ZERO,
        }
    }
}

/// Host document access for motion effects.
///
/// Methods take `&self`; implementations use interior mutability since effects
/// write styles from frame callbacks.
pub trait Document {
    /// Bounding rect of `element` in viewport coordinates, or `None` when the
    /// element is not attached to the document.
    fn bounding_rect(&self, element: ElementId) -> Option<Rect>;

    /// Set `element`'s opacity. Ignored for detached elements.
    fn set_opacity(&self, element: ElementId, opacity: f32);

    /// Set `element`'s translate. Ignored for detached elements.
    fn set_translate(&self, element: ElementId, translate: Vec2);

    /// Whether `element` is attached.
    fn contains(&self, element: ElementId) -> bool {
        self.bounding_rect(element).is_some()
    }
}

#[derive(Debug, Clone)]
struct Node {
    rect: Rect,
    style: Style,
    writes: usize,
}

/// In-memory document: a map of element rects and styles.
///
/// Rects are viewport-relative, like `getBoundingClientRect`; use
/// [`MemoryDocument::scroll_by`] to move everything as a scroll would.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    nodes: RefCell<HashMap<ElementId, Node>>,
    next_id: Cell<u64>,
}

impl MemoryDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new element at `rect` and return its id.
    pub fn create_element(&self, rect: Rect) -> ElementId {
        let id = ElementId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.nodes.borrow_mut().insert(
            id,
            Node {
                rect,
                style: Style::default(),
                writes: 0,
            },
        );
        id
    }

    /// Move an attached element. Unknown ids are ignored.
    pub fn set_rect(&self, element: ElementId, rect: Rect) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&element) {
            node.rect = rect;
        }
    }

    /// Shift every element up by `dy`, as scrolling the page down by `dy` would.
    pub fn scroll_by(&self, dy: f32) {
        for node in self.nodes.borrow_mut().values_mut() {
            node.rect.y -= dy;
        }
    }

    /// Remove an element from the document.
    pub fn detach(&self, element: ElementId) {
        self.nodes.borrow_mut().remove(&element);
    }

    /// Current style of an attached element.
    pub fn style(&self, element: ElementId) -> Option<Style> {
        self.nodes.borrow().get(&element).map(|n| n.style)
    }

    /// How many style writes `element` has received.
    pub fn write_count(&self, element: ElementId) -> usize {
        self.nodes.borrow().get(&element).map_or(0, |n| n.writes)
    }

    /// Number of attached elements.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// True when no element is attached.
    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }
}

impl Document for MemoryDocument {
    fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        self.nodes.borrow().get(&element).map(|n| n.rect)
    }

    fn set_opacity(&self, element: ElementId, opacity: f32) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&element) {
            node.style.opacity = opacity;
            node.writes += 1;
        }
    }

    fn set_translate(&self, element: ElementId, translate: Vec2) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&element) {
            node.style.translate = translate;
            node.writes += 1;
        }
    }
}

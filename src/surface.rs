//! Drawing surfaces the particle field renders into.
//!
//! [`DrawSurface`] is the small slice of a 2D canvas context the field needs:
//! size the backing store, set a uniform scale, clear, and fill circles.
//!
//! Two implementations ship with the crate:
//! - [`RecordingSurface`] keeps a shared log of [`DrawCommand`]s, for tests and
//!   headless runs.
//! - [`crate::gpu::CircleRenderer`] batches circles into a wgpu instance buffer.

use glam::{Vec2, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

/// The drawing operations the particle field performs.
pub trait DrawSurface {
    /// Resize the backing store to `width x height` physical pixels.
    fn resize_backing(&mut self, width: u32, height: u32);

    /// Set the CSS-pixel to physical-pixel scale applied to later draws.
    fn set_transform(&mut self, scale: f32);

    /// Clear the whole surface to transparent.
    fn clear(&mut self);

    /// Fill a circle centered at `center` (CSS pixels) with `color` at `alpha`.
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec3, alpha: f32);
}

impl<T: DrawSurface + ?Sized> DrawSurface for Box<T> {
    fn resize_backing(&mut self, width: u32, height: u32) {
        (**self).resize_backing(width, height);
    }

    fn set_transform(&mut self, scale: f32) {
        (**self).set_transform(scale);
    }

    fn clear(&mut self) {
        (**self).clear();
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec3, alpha: f32) {
        (**self).fill_circle(center, radius, color, alpha);
    }
}

/// Lets a host keep its own handle to a surface it lends to the field,
/// e.g. to present a GPU frame after the field has drawn into it.
impl<T: DrawSurface> DrawSurface for Rc<RefCell<T>> {
    fn resize_backing(&mut self, width: u32, height: u32) {
        self.borrow_mut().resize_backing(width, height);
    }

    fn set_transform(&mut self, scale: f32) {
        self.borrow_mut().set_transform(scale);
    }

    fn clear(&mut self) {
        self.borrow_mut().clear();
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec3, alpha: f32) {
        self.borrow_mut().fill_circle(center, radius, color, alpha);
    }
}

/// One recorded surface mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// `resize_backing` call.
    Resize {
        /// Physical width.
        width: u32,
        /// Physical height.
        height: u32,
    },
    /// `set_transform` call.
    Transform {
        /// CSS to physical scale.
        scale: f32,
    },
    /// `clear` call.
    Clear,
    /// `fill_circle` call.
    Circle {
        /// Center in CSS pixels.
        center: Vec2,
        /// Radius in CSS pixels.
        radius: f32,
        /// Fill color.
        color: Vec3,
        /// Fill opacity.
        alpha: f32,
    },
}

/// A surface that records every call into a shared log.
///
/// Clones share the log, so a test can hand one clone to the field and keep
/// the other to inspect what was drawn.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Rc<RefCell<Vec<DrawCommand>>>,
}

impl RecordingSurface {
    /// Create a surface with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every command recorded so far.
    pub fn commands(&self) -> Vec<DrawCommand> {
        self.log.borrow().clone()
    }

    /// Number of commands recorded so far.
    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<DrawCommand> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    /// Circles drawn after the most recent `clear`, i.e. the visible frame.
    pub fn last_frame(&self) -> Vec<DrawCommand> {
        let log = self.log.borrow();
        let start = log
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Clear))
            .map_or(0, |i| i + 1);
        log[start..]
            .iter()
            .filter(|c| matches!(c, DrawCommand::Circle { .. }))
            .copied()
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn resize_backing(&mut self, width: u32, height: u32) {
        self.log.borrow_mut().push(DrawCommand::Resize { width, height });
    }

    fn set_transform(&mut self, scale: f32) {
        self.log.borrow_mut().push(DrawCommand::Transform { scale });
    }

    fn clear(&mut self) {
        self.log.borrow_mut().push(DrawCommand::Clear);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec3, alpha: f32) {
        self.log.borrow_mut().push(DrawCommand::Circle {
            center,
            radius,
            color,
            alpha,
        });
    }
}

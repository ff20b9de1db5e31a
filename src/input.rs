//! Translation of window events into host events.
//!
//! The `Input` struct tracks the little window state needed to turn raw winit
//! events into [`HostEvent`]s: the last cursor position (for pointer deltas),
//! the accumulated scroll offset and the current physical size and scale
//! factor (for the viewport).
//!
//! # Usage
//!
//! ```ignore
//! fn window_event(&mut self, _: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
//!     if let Some(host_event) = self.input.handle_event(&event) {
//!         self.environment.dispatch(host_event);
//!     }
//! }
//! ```

use crate::viewport::{HostEvent, Viewport};
use glam::Vec2;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{MouseScrollDelta, WindowEvent};

/// CSS pixels scrolled per wheel line.
pub const LINE_HEIGHT: f32 = 40.0;

/// Window input state.
#[derive(Debug, Clone)]
pub struct Input {
    physical_size: PhysicalSize<u32>,
    scale_factor: f64,
    last_cursor: Option<Vec2>,
    scroll_y: f32,
    scroll_limit: Option<f32>,
}

impl Default for Input {
    fn default() -> Self {
        Self::new(PhysicalSize::new(800, 600), 1.0)
    }
}

impl Input {
    /// Create a tracker for a window of `physical_size` at `scale_factor`.
    pub fn new(physical_size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        Self {
            physical_size,
            scale_factor: sanitize_scale(scale_factor),
            last_cursor: None,
            scroll_y: 0.0,
            scroll_limit: None,
        }
    }

    /// Clamp scrolling to `[0, limit]` CSS pixels.
    pub fn with_scroll_limit(mut self, limit: f32) -> Self {
        self.scroll_limit = Some(limit.max(0.0));
        self
    }

    // ========== Queries ==========

    /// Viewport in CSS pixels for the current window size and scale factor.
    pub fn viewport(&self) -> Viewport {
        let scale = self.scale_factor as f32;
        Viewport::new(
            self.physical_size.width as f32 / scale,
            self.physical_size.height as f32 / scale,
        )
        .with_device_pixel_ratio(scale)
    }

    /// Accumulated scroll offset in CSS pixels.
    pub fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    /// Current window scale factor.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    // ========== Translation ==========

    /// The window was resized to `size` physical pixels.
    pub fn resized(&mut self, size: PhysicalSize<u32>) -> HostEvent {
        self.physical_size = size;
        HostEvent::Resized(self.viewport())
    }

    /// The window moved to a display with a different scale factor.
    pub fn scale_factor_changed(&mut self, scale_factor: f64) -> HostEvent {
        self.scale_factor = sanitize_scale(scale_factor);
        HostEvent::Resized(self.viewport())
    }

    /// The cursor moved to `position` physical pixels.
    ///
    /// The first position after entering the window only sets the baseline.
    pub fn cursor_moved(&mut self, position: PhysicalPosition<f64>) -> Option<HostEvent> {
        let css = Vec2::new(position.x as f32, position.y as f32) / self.scale_factor as f32;
        let previous = self.last_cursor.replace(css)?;
        let delta = css - previous;
        (delta != Vec2::ZERO).then_some(HostEvent::PointerMoved { delta })
    }

    /// The cursor left the window.
    pub fn cursor_left(&mut self) {
        self.last_cursor = None;
    }

    /// The wheel or touchpad scrolled by `delta`.
    pub fn wheel(&mut self, delta: MouseScrollDelta) -> Option<HostEvent> {
        // Positive wheel deltas scroll up, towards the top of the page
        let dy = match delta {
            MouseScrollDelta::LineDelta(_, lines) => -lines * LINE_HEIGHT,
            MouseScrollDelta::PixelDelta(pos) => -(pos.y / self.scale_factor) as f32,
        };
        let mut y = (self.scroll_y + dy).max(0.0);
        if let Some(limit) = self.scroll_limit {
            y = y.min(limit);
        }
        if y == self.scroll_y {
            return None;
        }
        self.scroll_y = y;
        Some(HostEvent::Scrolled { y })
    }

    /// Process a winit window event, returning the host event it maps to.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<HostEvent> {
        match event {
            WindowEvent::Resized(size) => Some(self.resized(*size)),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                Some(self.scale_factor_changed(*scale_factor))
            }
            WindowEvent::CursorMoved { position, .. } => self.cursor_moved(*position),
            WindowEvent::CursorLeft { .. } => {
                self.cursor_left();
                None
            }
            WindowEvent::MouseWheel { delta, .. } => self.wheel(*delta),
            _ => None,
        }
    }
}

fn sanitize_scale(scale_factor: f64) -> f64 {
    if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_in_css_pixels() {
        let input = Input::new(PhysicalSize::new(2048, 1536), 2.0);
        let vp = input.viewport();
        assert_eq!(vp.width, 1024.0);
        assert_eq!(vp.height, 768.0);
        assert_eq!(vp.device_pixel_ratio, 2.0);
        assert_eq!(vp.backing_size(), (2048, 1536));
    }

    #[test]
    fn test_first_cursor_position_is_baseline() {
        let mut input = Input::default();
        assert_eq!(input.cursor_moved(PhysicalPosition::new(100.0, 100.0)), None);
        assert_eq!(
            input.cursor_moved(PhysicalPosition::new(110.0, 95.0)),
            Some(HostEvent::PointerMoved { delta: Vec2::new(10.0, -5.0) })
        );

        input.cursor_left();
        assert_eq!(input.cursor_moved(PhysicalPosition::new(0.0, 0.0)), None);
    }

    #[test]
    fn test_cursor_delta_scaled_to_css() {
        let mut input = Input::new(PhysicalSize::new(1600, 1200), 2.0);
        input.cursor_moved(PhysicalPosition::new(0.0, 0.0));
        assert_eq!(
            input.cursor_moved(PhysicalPosition::new(20.0, 0.0)),
            Some(HostEvent::PointerMoved { delta: Vec2::new(10.0, 0.0) })
        );
    }

    #[test]
    fn test_wheel_accumulates_and_clamps() {
        let mut input = Input::default().with_scroll_limit(100.0);
        assert_eq!(
            input.wheel(MouseScrollDelta::LineDelta(0.0, -1.0)),
            Some(HostEvent::Scrolled { y: 40.0 })
        );
        input.wheel(MouseScrollDelta::LineDelta(0.0, -5.0));
        assert_eq!(input.scroll_y(), 100.0);
        // Already at the limit
        assert_eq!(input.wheel(MouseScrollDelta::LineDelta(0.0, -1.0)), None);

        input.wheel(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 500.0)));
        assert_eq!(input.scroll_y(), 0.0);
    }

    #[test]
    fn test_scale_factor_change_resizes() {
        let mut input = Input::new(PhysicalSize::new(1000, 1000), 1.0);
        let HostEvent::Resized(vp) = input.scale_factor_changed(2.0) else {
            panic!("expected a resize");
        };
        assert_eq!(vp.width, 500.0);
        assert_eq!(input.scale_factor_changed(f64::NAN), HostEvent::Resized(Viewport::new(1000.0, 1000.0)));
    }
}

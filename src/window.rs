//! Demo window: a starfield behind nothing, driven by winit.
//!
//! The window forwards its events to an [`Environment`] through [`Input`],
//! runs the [`FrameQueue`] on every redraw and then presents whatever the
//! mounted field drew into the [`CircleRenderer`].

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::error::AppError;
use crate::field::FieldConfig;
use crate::gpu::CircleRenderer;
use crate::input::Input;
use crate::lifecycle::{mount_field, FieldHandle};
use crate::scheduler::{FrameQueue, FrameScheduler};
use crate::surface::DrawSurface;
use crate::viewport::Environment;

/// Window setup for [`run`].
#[derive(Debug, Clone)]
pub struct WindowOptions {
    /// Window title.
    pub title: String,
    /// Initial inner size in logical pixels.
    pub width: u32,
    /// Initial inner size in logical pixels.
    pub height: u32,
    /// Configuration of the mounted field.
    pub field: FieldConfig,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "stardrift".to_string(),
            width: 1280,
            height: 720,
            field: FieldConfig::default(),
        }
    }
}

/// The demo application.
pub struct App {
    options: WindowOptions,
    window: Option<Arc<Window>>,
    renderer: Option<Rc<RefCell<CircleRenderer>>>,
    input: Input,
    environment: Rc<Environment>,
    frames: Rc<FrameQueue>,
    field: Option<FieldHandle>,
    start: Instant,
    error: Option<AppError>,
}

impl App {
    pub fn new(options: WindowOptions) -> Self {
        Self {
            options,
            window: None,
            renderer: None,
            input: Input::default(),
            environment: Rc::new(Environment::default()),
            frames: Rc::new(FrameQueue::new()),
            field: None,
            start: Instant::now(),
            error: None,
        }
    }

    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.frames.run_frame(self.now_ms());

        if let Some(renderer) = &self.renderer {
            let mut renderer = renderer.borrow_mut();
            match renderer.present() {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => renderer.reconfigure(),
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("GPU out of memory, exiting");
                    event_loop.exit();
                }
                Err(e) => log::error!("Render error: {:?}", e),
            }
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.options.title.clone())
            .with_inner_size(LogicalSize::new(self.options.width, self.options.height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.error = Some(e.into());
                event_loop.exit();
                return;
            }
        };

        self.input = Input::new(window.inner_size(), window.scale_factor());
        self.environment.resize(self.input.viewport());

        let surface: Option<Box<dyn DrawSurface>> = match pollster::block_on(CircleRenderer::new(window.clone())) {
            Ok(renderer) => {
                let renderer = Rc::new(RefCell::new(renderer));
                self.renderer = Some(renderer.clone());
                Some(Box::new(renderer) as Box<dyn DrawSurface>)
            }
            Err(e) => {
                log::error!("{}", e);
                None
            }
        };

        let scheduler: Rc<dyn FrameScheduler> = self.frames.clone();
        self.field = Some(mount_field(
            &self.environment,
            &scheduler,
            surface,
            self.options.field.clone(),
        ));

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(field) = self.field.take() {
                    field.dispose();
                }
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            other => {
                if let Some(host_event) = self.input.handle_event(&other) {
                    self.environment.dispatch(host_event);
                }
            }
        }
    }
}

/// Open the demo window and run until it is closed.
pub fn run(options: WindowOptions) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(options);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

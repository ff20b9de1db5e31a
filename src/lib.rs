//! # stardrift
//!
//! Ambient particle fields and viewport-driven motion for decorative
//! backgrounds.
//!
//! Two independent pieces share one frame scheduler:
//!
//! - a **particle field**: a twinkling, slowly drifting starfield that fills
//!   the viewport at device resolution and regenerates when the viewport changes
//! - a **motion controller**: one-shot reveals, scroll and pointer parallax and
//!   floating elements, all driven by host signals
//!
//! ## Quick Start
//!
//! ```ignore
//! use stardrift::prelude::*;
//!
//! let (host, frames, document) = Host::in_memory(Viewport::new(1280.0, 720.0));
//! let host = host.with_polling_observer();
//!
//! let surface = RecordingSurface::new();
//! let field = host.mount_field(Some(Box::new(surface.clone())), FieldConfig::default());
//!
//! let card = document.create_element(Rect::new(0.0, 900.0, 400.0, 300.0));
//! let reveal = host.observe_reveal(card, RevealOptions::default());
//!
//! frames.advance(16.0);
//! assert_eq!(surface.last_frame().len(), field.particle_count());
//! ```
//!
//! ## Core Concepts
//!
//! ### Frames
//!
//! Everything animated runs through a [`FrameScheduler`](scheduler::FrameScheduler):
//! "call me on the next display refresh". [`FrameQueue`](scheduler::FrameQueue)
//! implements it and is driven either by a window's redraw loop or, in tests,
//! by advancing a fake clock.
//!
//! ### Host signals
//!
//! Viewport size, device pixel ratio, scroll position and pointer movement
//! arrive through an [`Environment`](viewport::Environment). Effects subscribe
//! to it and unsubscribe when disposed.
//!
//! ### Handles
//!
//! Every mount or attach call returns a handle. `dispose()` is synchronous and
//! idempotent, and dropping a handle disposes it. Once disposed, nothing the
//! handle started will touch the surface or the document again.
//!
//! ## Degrading
//!
//! Missing capabilities never fail the page: without a drawing surface the
//! field does nothing, and without a visibility observer reveals apply
//! immediately.

pub mod error;
pub mod field;
pub mod gpu;
pub mod host;
pub mod input;
pub mod lifecycle;
pub mod motion;
pub mod particle;
pub mod scheduler;
pub mod spawn;
pub mod surface;
pub mod time;
pub mod viewport;
pub mod window;

pub use bytemuck;
pub use glam::{Vec2, Vec3};

pub use error::{AppError, CapabilityError, ConfigError, GpuError};
pub use field::{FieldConfig, ParticleField, SizeClass};
pub use host::Host;
pub use lifecycle::{mount_field, FieldHandle, MountState};
pub use particle::Particle;
pub use scheduler::{FrameQueue, FrameScheduler};
pub use surface::{DrawCommand, DrawSurface, RecordingSurface};
pub use time::Time;
pub use viewport::{Environment, HostEvent, Rect, Viewport};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::ConfigError;
    pub use crate::field::{FieldConfig, ParticleField, SizeClass};
    pub use crate::host::Host;
    pub use crate::lifecycle::{FieldHandle, MountState};
    pub use crate::motion::{
        Document, Easing, ElementId, FloatOptions, MemoryDocument, ParallaxLayer, ParallaxSource,
        PointerParallax, RevealOptions, RootMargin, ScrollParallax,
    };
    pub use crate::particle::Particle;
    pub use crate::scheduler::{FrameQueue, FrameScheduler};
    pub use crate::surface::{DrawSurface, RecordingSurface};
    pub use crate::viewport::{Environment, Rect, Viewport};
    pub use glam::{Vec2, Vec3};
}

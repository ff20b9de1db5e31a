//! Page-facing entry point.
//!
//! A [`Host`] bundles the capabilities a page provides (event hub, frame
//! scheduler, document and, optionally, a visibility observer) and exposes
//! every effect behind one set of calls.
//!
//! ```ignore
//! let (host, frames, document) = Host::in_memory(Viewport::new(1280.0, 720.0));
//! let host = host.with_polling_observer();
//!
//! let _field = host.mount_field(Some(Box::new(surface)), FieldConfig::default());
//! let heading = document.create_element(Rect::new(0.0, 900.0, 600.0, 80.0));
//! let _reveal = host.observe_reveal(heading, RevealOptions::default());
//!
//! loop {
//!     frames.advance(16.0);
//! }
//! ```

use crate::error::ConfigError;
use crate::field::FieldConfig;
use crate::lifecycle::{self, FieldHandle};
use crate::motion::{
    self, Document, ElementId, FloatHandle, FloatOptions, MemoryDocument, ParallaxHandle, ParallaxLayer,
    ParallaxSource, PollingObserver, RevealHandle, RevealOptions, VisibilityObserver,
};
use crate::scheduler::{FrameQueue, FrameScheduler};
use crate::surface::DrawSurface;
use crate::viewport::{Environment, Viewport};
use std::rc::Rc;

/// Host capabilities plus the page API built on them.
#[derive(Clone)]
pub struct Host {
    environment: Rc<Environment>,
    scheduler: Rc<dyn FrameScheduler>,
    document: Rc<dyn Document>,
    observer: Option<Rc<dyn VisibilityObserver>>,
}

impl Host {
    /// Create a host without a visibility observer.
    pub fn new(
        environment: Rc<Environment>,
        scheduler: Rc<dyn FrameScheduler>,
        document: Rc<dyn Document>,
    ) -> Self {
        Self {
            environment,
            scheduler,
            document,
            observer: None,
        }
    }

    /// Host backed by a [`FrameQueue`] and a [`MemoryDocument`], both returned
    /// so the caller can drive frames and lay out elements.
    pub fn in_memory(viewport: Viewport) -> (Self, Rc<FrameQueue>, Rc<MemoryDocument>) {
        let frames = Rc::new(FrameQueue::new());
        let document = Rc::new(MemoryDocument::new());
        let host = Self::new(
            Rc::new(Environment::new(viewport)),
            frames.clone(),
            document.clone(),
        );
        (host, frames, document)
    }

    /// Use `observer` for reveal registrations.
    pub fn with_observer(mut self, observer: Rc<dyn VisibilityObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Use a [`PollingObserver`] over this host's environment and document.
    pub fn with_polling_observer(self) -> Self {
        let observer = PollingObserver::new(
            self.environment.clone(),
            self.document.clone(),
            self.scheduler.clone(),
        );
        self.with_observer(observer)
    }

    /// The environment event hub.
    pub fn environment(&self) -> &Rc<Environment> {
        &self.environment
    }

    /// The frame scheduler.
    pub fn scheduler(&self) -> &Rc<dyn FrameScheduler> {
        &self.scheduler
    }

    /// The document.
    pub fn document(&self) -> &Rc<dyn Document> {
        &self.document
    }

    /// True when reveal registrations are observed rather than applied at once.
    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Mount a full-viewport particle field. See [`lifecycle::mount_field`].
    pub fn mount_field(&self, surface: Option<Box<dyn DrawSurface>>, config: FieldConfig) -> FieldHandle {
        lifecycle::mount_field(&self.environment, &self.scheduler, surface, config)
    }

    /// Reveal `element` once it becomes visible.
    pub fn observe_reveal(&self, element: ElementId, options: RevealOptions) -> RevealHandle {
        motion::observe_reveal(
            &self.document,
            self.observer.as_ref(),
            &self.scheduler,
            element,
            options,
        )
    }

    /// Register several elements with the same reveal options.
    pub fn observe_reveal_all(
        &self,
        elements: impl IntoIterator<Item = ElementId>,
        options: RevealOptions,
    ) -> Vec<RevealHandle> {
        elements
            .into_iter()
            .map(|element| self.observe_reveal(element, options))
            .collect()
    }

    /// Attach layered parallax. Fails on misordered attenuations or invalid tuning.
    pub fn attach_parallax(
        &self,
        layers: Vec<ParallaxLayer>,
        source: ParallaxSource,
    ) -> Result<ParallaxHandle, ConfigError> {
        motion::attach_parallax(&self.environment, &self.document, &self.scheduler, layers, source)
    }

    /// Float `element` around its rest position.
    pub fn attach_float(&self, element: ElementId, options: FloatOptions) -> FloatHandle {
        motion::attach_float(&self.document, &self.scheduler, element, options)
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("environment", &self.environment)
            .field("has_observer", &self.has_observer())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;
    use crate::viewport::Rect;

    #[test]
    fn test_in_memory_host_mounts_and_reveals() {
        let (host, frames, document) = Host::in_memory(Viewport::new(1024.0, 768.0));
        let host = host.with_polling_observer();
        assert!(host.has_observer());

        let field = host.mount_field(Some(Box::new(RecordingSurface::new())), FieldConfig::default());
        let el = document.create_element(Rect::new(0.0, 100.0, 200.0, 200.0));
        let reveal = host.observe_reveal(el, RevealOptions::default());

        frames.advance(16.0);
        assert!(field.is_running());
        assert!(reveal.is_revealed());
    }

    #[test]
    fn test_host_without_observer_fails_open() {
        let (host, _frames, document) = Host::in_memory(Viewport::new(800.0, 600.0));
        let els: Vec<_> = (0..3)
            .map(|i| document.create_element(Rect::new(0.0, 5000.0 + i as f32 * 100.0, 10.0, 10.0)))
            .collect();
        let handles = host.observe_reveal_all(els.iter().copied(), RevealOptions::default());
        assert!(handles.iter().all(|h| h.is_revealed()));
        assert!(els.iter().all(|el| document.style(*el).unwrap().opacity == 1.0));
    }
}

//! Per-refresh frame scheduling.
//!
//! Everything that animates in stardrift is driven through a [`FrameScheduler`]:
//! a callback is registered for the next display refresh and may re-register
//! itself from inside the callback, or simply not, which ends the loop.
//!
//! [`FrameQueue`] is the one implementation shipped with the crate. It runs
//! queued callbacks whenever the host calls [`FrameQueue::run_frame`], which
//! makes it both the real driver for a window event loop (call it on every
//! redraw) and a deterministic fake clock for tests.
//!
//! ```ignore
//! let frames = Rc::new(FrameQueue::new());
//! frames.request_frame(Box::new(|now| println!("frame at {now} ms")));
//! frames.advance(16.0);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

/// Callback run on a display refresh, receiving the frame timestamp in ms.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Identifies one scheduled callback so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Wrap a scheduler-specific id. For implementors of [`FrameScheduler`].
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The wrapped id.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Host primitive for "run this once on the next display refresh".
pub trait FrameScheduler {
    /// Schedule `callback` for the next frame.
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;

    /// Cancel a scheduled callback. Unknown or already-run handles are ignored.
    fn cancel_frame(&self, handle: FrameHandle);

    /// Current host time in milliseconds.
    fn now(&self) -> f64;
}

/// Queue of pending frame callbacks, flushed one frame at a time.
///
/// Callbacks requested while a frame is running land in the *next* frame.
/// Cancelling a callback that was already dequeued for the running frame still
/// prevents it from running.
#[derive(Default)]
pub struct FrameQueue {
    now: Cell<f64>,
    next_id: Cell<u64>,
    queue: RefCell<Vec<(FrameHandle, FrameCallback)>>,
    cancelled: RefCell<HashSet<FrameHandle>>,
    frames_run: Cell<u64>,
}

impl FrameQueue {
    /// Create an empty queue with the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue with the clock at `now` milliseconds.
    pub fn starting_at(now: f64) -> Self {
        let queue = Self::default();
        queue.now.set(now);
        queue
    }

    /// Run every callback queued before this call, stamped with `timestamp`.
    ///
    /// Returns the number of callbacks that actually ran.
    pub fn run_frame(&self, timestamp: f64) -> usize {
        self.now.set(timestamp);
        self.frames_run.set(self.frames_run.get() + 1);

        let due = std::mem::take(&mut *self.queue.borrow_mut());
        let mut ran = 0;
        for (handle, callback) in due {
            if self.cancelled.borrow_mut().remove(&handle) {
                continue;
            }
            callback(timestamp);
            ran += 1;
        }
        // Handles cancelled after they ran, or never queued, are stale now
        self.cancelled.borrow_mut().clear();
        ran
    }

    /// Advance the clock by `dt_ms` and run one frame.
    pub fn advance(&self, dt_ms: f64) -> usize {
        self.run_frame(self.now.get() + dt_ms)
    }

    /// Run `frames` consecutive frames `dt_ms` apart.
    pub fn run_frames(&self, frames: usize, dt_ms: f64) -> usize {
        (0..frames).map(|_| self.advance(dt_ms)).sum()
    }

    /// Number of callbacks waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// True when nothing is waiting for the next frame.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Total frames run since creation.
    pub fn frames_run(&self) -> u64 {
        self.frames_run.get()
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let handle = FrameHandle(self.next_id.get());
        self.next_id.set(handle.0 + 1);
        self.queue.borrow_mut().push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let removed = {
            let mut queue = self.queue.borrow_mut();
            let index = queue.iter().position(|(h, _)| *h == handle);
            index.map(|index| queue.remove(index))
        };
        match removed {
            // Dropped outside the borrow: its captures may cancel other frames
            Some(entry) => drop(entry),
            None => {
                self.cancelled.borrow_mut().insert(handle);
            }
        }
    }

    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Something driven frame by frame through [`schedule`].
///
/// The implementor owns the slot holding its pending [`FrameHandle`]; an
/// occupied slot means a frame is already requested, which is what coalesces
/// bursts of signals into at most one tick per frame.
pub(crate) trait Animated: 'static {
    /// Slot for the pending frame request.
    fn frame_slot(&self) -> &Cell<Option<FrameHandle>>;

    /// Run one frame. Return `true` to be scheduled again.
    fn tick(&self, timestamp: f64) -> bool;
}

/// Request a frame for `target` unless one is already pending.
///
/// The queued callback holds only weak references, so a dropped target or
/// scheduler ends the loop instead of keeping either alive.
pub(crate) fn schedule<A: Animated>(scheduler: &Rc<dyn FrameScheduler>, target: &Rc<A>) {
    if target.frame_slot().get().is_some() {
        return;
    }
    let weak_target = Rc::downgrade(target);
    let weak_scheduler = Rc::downgrade(scheduler);
    let handle = scheduler.request_frame(Box::new(move |timestamp| {
        let (Some(target), Some(scheduler)) = (weak_target.upgrade(), weak_scheduler.upgrade()) else {
            return;
        };
        target.frame_slot().set(None);
        if target.tick(timestamp) {
            schedule(&scheduler, &target);
        }
    }));
    target.frame_slot().set(Some(handle));
}

/// Cancel `target`'s pending frame, if any.
pub(crate) fn unschedule<A: Animated>(scheduler: &dyn FrameScheduler, target: &A) {
    if let Some(handle) = target.frame_slot().take() {
        scheduler.cancel_frame(handle);
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .field("frames_run", &self.frames_run.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_callbacks_run_once_with_timestamp() {
        let frames = FrameQueue::new();
        let seen = Rc::new(Cell::new(0.0));
        let seen2 = seen.clone();
        frames.request_frame(Box::new(move |t| seen2.set(t)));

        assert_eq!(frames.advance(16.0), 1);
        assert_eq!(seen.get(), 16.0);
        assert_eq!(frames.advance(16.0), 0);
    }

    #[test]
    fn test_rescheduling_lands_in_next_frame() {
        let frames = Rc::new(FrameQueue::new());
        let count = Rc::new(Cell::new(0));

        fn tick(frames: Rc<FrameQueue>, count: Rc<Cell<u32>>) {
            let f = frames.clone();
            frames.request_frame(Box::new(move |_| {
                count.set(count.get() + 1);
                tick(f, count);
            }));
        }
        tick(frames.clone(), count.clone());

        frames.run_frames(3, 16.0);
        assert_eq!(count.get(), 3);
        assert_eq!(frames.pending(), 1);
    }

    #[test]
    fn test_cancel_pending() {
        let frames = FrameQueue::new();
        let ran = Rc::new(Cell::new(false));
        let ran2 = ran.clone();
        let handle = frames.request_frame(Box::new(move |_| ran2.set(true)));
        frames.cancel_frame(handle);

        assert!(frames.is_idle());
        frames.advance(16.0);
        assert!(!ran.get());
    }

    #[test]
    fn test_cancel_during_same_frame() {
        let frames = Rc::new(FrameQueue::new());
        let ran = Rc::new(Cell::new(false));
        let victim = Rc::new(Cell::new(None));

        let f = frames.clone();
        let v = victim.clone();
        frames.request_frame(Box::new(move |_| {
            if let Some(handle) = v.get() {
                f.cancel_frame(handle);
            }
        }));
        let ran2 = ran.clone();
        victim.set(Some(frames.request_frame(Box::new(move |_| ran2.set(true)))));

        assert_eq!(frames.advance(16.0), 1);
        assert!(!ran.get());
    }

    struct CancelOnDrop {
        frames: Rc<FrameQueue>,
        target: FrameHandle,
    }

    impl Drop for CancelOnDrop {
        fn drop(&mut self) {
            self.frames.cancel_frame(self.target);
        }
    }

    #[test]
    fn test_cancelled_callback_dropped_after_borrow_released() {
        let frames = Rc::new(FrameQueue::new());
        let ran = Rc::new(Cell::new(false));
        let ran2 = ran.clone();
        let other = frames.request_frame(Box::new(move |_| ran2.set(true)));

        let guard = CancelOnDrop {
            frames: frames.clone(),
            target: other,
        };
        let first = frames.request_frame(Box::new(move |_| {
            let _keep = &guard;
        }));

        frames.cancel_frame(first);
        assert!(frames.is_idle());
        assert_eq!(frames.advance(16.0), 0);
        assert!(!ran.get());
    }
}

//! Frame timing fed by scheduler timestamps.
//!
//! Hosts hand each frame callback a millisecond timestamp; [`Time`] turns those
//! into a clamped per-frame delta plus some bookkeeping (frame count, elapsed
//! time, a periodically sampled FPS).
//!
//! The delta is clamped to [`Time::max_delta`] so a frame that arrives after a
//! long stall (backgrounded tab, debugger pause) does not fling particles
//! across the screen.
//!
//! # Example
//!
//! ```ignore
//! use stardrift::time::Time;
//!
//! let mut time = Time::new(0.0);
//! let dt = time.update(16.0);
//! assert!((dt - 0.016).abs() < 1e-6);
//! ```

/// Default upper bound for a frame delta, in seconds.
pub const DEFAULT_MAX_DELTA: f32 = 0.033;

/// How often the FPS estimate is refreshed, in milliseconds.
const FPS_UPDATE_INTERVAL_MS: f64 = 500.0;

/// Time tracking for a frame loop.
#[derive(Debug, Clone)]
pub struct Time {
    /// Timestamp the tracker was created at (ms).
    start: f64,
    /// Timestamp of the last frame (ms).
    last_frame: f64,
    /// Total elapsed time in seconds.
    elapsed_secs: f32,
    /// Clamped time since last frame in seconds.
    delta_secs: f32,
    /// Upper bound for `delta_secs`.
    max_delta: f32,
    /// Total frames since start.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Timestamp of last FPS calculation (ms).
    fps_update_time: f64,
}

impl Time {
    /// Create a tracker whose first delta is measured from `now` (ms).
    pub fn new(now: f64) -> Self {
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            max_delta: DEFAULT_MAX_DELTA,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
        }
    }

    /// Set the delta clamp in seconds.
    pub fn with_max_delta(mut self, max_delta: f32) -> Self {
        self.max_delta = max_delta.max(0.0);
        self
    }

    /// Record a frame at `timestamp` (ms) and return the clamped delta in seconds.
    ///
    /// Timestamps that go backwards yield a zero delta.
    pub fn update(&mut self, timestamp: f64) -> f32 {
        let raw = ((timestamp - self.last_frame) / 1000.0).max(0.0) as f32;
        self.delta_secs = raw.min(self.max_delta);
        self.last_frame = timestamp.max(self.last_frame);
        self.elapsed_secs = ((self.last_frame - self.start) / 1000.0) as f32;
        self.frame_count += 1;

        let fps_elapsed = self.last_frame - self.fps_update_time;
        if fps_elapsed >= FPS_UPDATE_INTERVAL_MS {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = (frames_since as f64 / (fps_elapsed / 1000.0)) as f32;
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = self.last_frame;
        }

        self.delta_secs
    }

    /// Restart delta measurement from `now` without counting a frame.
    ///
    /// Used when a loop resumes after being idle.
    pub fn resync(&mut self, now: f64) {
        self.last_frame = now.max(self.last_frame);
    }

    /// Total elapsed time in seconds since creation.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Clamped time since last frame in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Current delta clamp in seconds.
    #[inline]
    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }

    /// Total frames since creation.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Calculated frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

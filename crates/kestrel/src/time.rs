//! Frame timing and delta time.
//!
//! The host loop owns the clock: it hands each frame's delta to
//! [`Time::advance`], and every hook reads the result through
//! [`Context::time`](crate::Context). Nothing here samples wall-clock time.

use std::time::Duration;

/// Frame timing, advanced once per frame by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Time {
    /// Duration of the current frame.
    delta: Duration,
    /// Total simulated time since startup.
    elapsed: Duration,
    /// Frame counter.
    frame_count: u64,
}

impl Time {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame that lasts `delta`.
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed = self.elapsed.saturating_add(delta);
        self.frame_count += 1;
    }

    /// Like [`advance`](Self::advance), in seconds. Negative, NaN, infinite
    /// and unrepresentably large deltas count as zero.
    pub fn advance_secs(&mut self, delta: f32) {
        let delta = Duration::try_from_secs_f32(delta).unwrap_or(Duration::ZERO);
        self.advance(delta);
    }

    /// Duration of the current frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Delta time in seconds (f32), the most common way to use it.
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Number of frames advanced so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the current frame's delta.
    pub fn fps(&self) -> f32 {
        if self.delta_secs() > 0.0 {
            1.0 / self.delta_secs()
        } else {
            0.0
        }
    }
}

//! Frame clock for the render loop.

use std::time::{Duration, Instant};

/// Tracks frame timing and total elapsed time since the loop started.
#[derive(Debug)]
pub struct Time {
    /// Wall-clock instant of the last frame.
    last_frame: Instant,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a clock starting now.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Update timing at the start of a new frame from the wall clock.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;
        self.advance(delta);
    }

    /// Advance the clock by an explicit amount (scripted runs and tests).
    pub fn advance(&mut self, delta: Duration) {
        self.elapsed += delta;
        self.frame_count += 1;
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

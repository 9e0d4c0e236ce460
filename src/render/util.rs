//! Render utility helpers.
//!
//! Frame timing for the redraw loop: the tween engine is advanced by the clamped time
//! since the previous frame.

use std::time::{Duration, Instant};

/// A frame timer that tracks:
/// - `elapsed`: time since creation
/// - `dt`: time since the last `tick()`
///
/// `tick()` clamps unreasonable `dt` (e.g. after the window was hidden, or when resuming
/// from a breakpoint) so tweens jump at most `max_dt` per frame.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    max_dt: Duration,
}

impl FrameClock {
    /// Create a new clock with a 100 ms `max_dt` clamp.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            max_dt: Duration::from_millis(100),
        }
    }

    #[inline]
    pub fn with_max_dt(mut self, max_dt: Duration) -> Self {
        self.max_dt = max_dt;
        self
    }

    /// Time since this clock was created.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Advance the clock and return the clamped `dt`.
    #[inline]
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        dt.min(self.max_dt)
    }

    /// Reset the clock start time (and last tick) to now.
    #[inline]
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last = now;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

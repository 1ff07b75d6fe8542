use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of recent events averaged by a [`RateMeter`].
pub const RATE_WINDOW: usize = 50;

/// A meter whose newest event is older than this reports zero.
const IDLE_AFTER: Duration = Duration::from_secs(2);

/// Events-per-second over a sliding window of recent timestamps.
///
/// Averaging the last [`RATE_WINDOW`] events smooths out burst arrival,
/// where a whole frame's worth of datagrams lands at once.
#[derive(Debug, Clone)]
pub struct RateMeter {
    window: VecDeque<Instant>,
    capacity: usize,
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(RATE_WINDOW)
    }
}

impl RateMeter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, at: Instant) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(at);
    }

    /// Average rate over the window as seen at `now`.
    pub fn rate(&self, now: Instant) -> f64 {
        let (Some(&oldest), Some(&newest)) = (self.window.front(), self.window.back()) else {
            return 0.0;
        };
        if now.saturating_duration_since(newest) > IDLE_AFTER {
            return 0.0;
        }
        let span = newest.saturating_duration_since(oldest).as_secs_f64();
        if span <= 0.0 {
            return 0.0;
        }
        (self.window.len() - 1) as f64 / span
    }
}

use std::time::{Duration, Instant};

/// Cooldown guard between accepted button presses.
///
/// Accepting a press moves the window forward immediately, so a slow capture
/// holds off the next press from the moment of acceptance rather than
/// completion. Rejected presses leave the window untouched.
#[derive(Debug)]
pub struct Debounce {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Debounce {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Returns whether the press at `now` should trigger a capture.
    pub fn try_accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

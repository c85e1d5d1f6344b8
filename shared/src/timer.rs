use std::time::{Duration, Instant};

/// Rings once `duration` has elapsed since the last reset. Callers pass the
/// current instant in, so the timer never reads the clock itself.
pub struct Timer {
    duration: Duration,
    last: Instant,
}

impl Timer {
    pub fn new(duration: Duration, now: Instant) -> Self {
        Self {
            duration,
            last: now,
        }
    }

    pub fn reset(&mut self, now: Instant) {
        self.last = now;
    }

    pub fn ringing(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) >= self.duration
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

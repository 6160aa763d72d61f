use std::time::{Duration, Instant};

/// Lets an event through at most once per `interval`.
///
/// The throttle is armed at construction: the first event passes only once
/// strictly more than `interval` has elapsed since `start`. Callers pass the
/// current instant in, which keeps this type free of any particular clock.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    interval: Duration,
    last: Instant,
}

impl Throttle {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self { interval, last: start }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` (and resets the window) if the event may fire at `now`.
    pub fn ready(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) > self.interval {
            self.last = now;
            return true;
        }
        false
    }
}

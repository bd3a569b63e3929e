use std::cell::Cell;
use std::time::Instant;

/// Source of animation timestamps, in milliseconds. Swappable so playback
/// math can run against simulated time in tests and headless tools.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Monotonic wall clock, measured from construction.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-cranked clock for deterministic playback.
#[derive(Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_ms(), 0.0);
        clock.advance(16.0);
        clock.advance(16.0);
        assert_eq!(clock.now_ms(), 32.0);
        clock.set(500.0);
        assert_eq!(clock.now_ms(), 500.0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let t1 = clock.now_ms();
        let t2 = clock.now_ms();
        assert!(t2 >= t1);
    }
}

//! Logical execution clock and real-time pacing.
//!
//! The clock is a pure accumulator of task durations; whether advancing it
//! also costs wall-clock time is the pacer's business. Production agents
//! pace with real sleeps so the fleet's clocks stay roughly aligned; tests
//! and offline evaluation use the instant pacer and run the same code in
//! zero time.

use async_trait::async_trait;
use std::time::Duration;

/// Per-agent accumulated duration counter driving handoff decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogicalClock {
    now: f64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Jump to an absolute logical time (the start of a task).
    pub fn set(&mut self, now: f64) {
        self.now = now;
    }

    /// Advance by a duration and return the new logical time.
    pub fn advance(&mut self, seconds: f64) -> f64 {
        self.now += seconds;
        self.now
    }
}

/// Converts logical durations into wall-clock suspension.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pace(&self, seconds: f64);
}

/// Sleeps for the full logical duration.
pub struct RealTimePacer;

#[async_trait]
impl Pacer for RealTimePacer {
    async fn pace(&self, seconds: f64) {
        if seconds > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        }
    }
}

/// Never suspends; for tests and offline evaluation.
pub struct InstantPacer;

#[async_trait]
impl Pacer for InstantPacer {
    async fn pace(&self, _seconds: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_accumulates_and_resets() {
        let mut clock = LogicalClock::new();
        assert_eq!(clock.now(), 0.0);
        assert_eq!(clock.advance(5.0), 5.0);
        assert_eq!(clock.advance(13.0), 18.0);
        clock.set(36.0);
        assert_eq!(clock.now(), 36.0);
    }

    #[tokio::test]
    async fn instant_pacer_returns_immediately() {
        let started = std::time::Instant::now();
        InstantPacer.pace(3600.0).await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}

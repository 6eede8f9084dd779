//! # Fibonacci Backoff
//!
//! Progressive retry delays for failed list/watch calls. Grows more slowly
//! than exponential backoff, so a flapping API server is retried steadily
//! without being hammered.
//!
//! Sequence for `new(1s, 10s)`: 1s, 1s, 2s, 3s, 5s, 8s, 10s (max).

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum delay (for reset)
    min: Duration,
    /// Previous delay
    prev: Duration,
    /// Next delay to hand out
    current: Duration,
    /// Maximum delay
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with the given minimum and maximum delays.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min.min(max),
            max,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;

        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = next.min(self.max);

        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min.min(self.max);
    }
}

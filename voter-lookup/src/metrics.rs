//! Metrics tracking for lookup operations.

use std::time::Duration;

use serde::Serialize;

/// Metrics collected during one lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LookupMetrics {
    /// Total number of attempts made.
    pub total_attempts: u32,
    /// Wall-clock time elapsed, including backoff sleeps.
    pub wall_time: Duration,
    /// Time spent sleeping between attempts.
    pub backoff_time: Duration,
}

impl LookupMetrics {
    /// Number of attempts beyond the first.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.total_attempts.saturating_sub(1)
    }
}

//! Point-in-time statistics derived from the outcome window and open history

use serde::Serialize;

/// Raw counts taken from the sliding window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowTally {
    pub total: usize,
    pub failures: usize,
}

impl WindowTally {
    /// Failures over total, `0.0` for an empty window
    pub fn failure_rate(&self) -> f64 {
        if self.total > 0 {
            self.failures as f64 / self.total as f64
        } else {
            0.0
        }
    }
}

/// Advance a success/failure streak by one outcome.
///
/// Positive streaks count consecutive successes, negative ones consecutive
/// failures. Switching outcome type restarts at `1` or `-1`.
pub fn next_streak(streak: i64, success: bool) -> i64 {
    match (success, streak) {
        (true, s) if s >= 0 => s.saturating_add(1),
        (true, _) => 1,
        (false, s) if s <= 0 => s.saturating_sub(1),
        (false, _) => -1,
    }
}

/// Snapshot returned by [`Breaker::stats`](crate::Breaker::stats)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerStats {
    /// Outcomes currently in the window
    pub total: usize,
    /// Failed outcomes currently in the window
    pub failures: usize,
    /// `failures / total`, or `0.0` when the window is empty
    pub failure_rate: f64,
    /// Wall time (Unix seconds) of the most recent transition into Open
    pub last_opened_at: Option<f64>,
    /// Lifetime number of transitions into Open
    pub total_opens: u64,
    /// Consecutive closed-state outcomes, positive for successes
    pub current_streak: i64,
}

impl BreakerStats {
    pub(crate) fn new(
        tally: WindowTally,
        last_opened_at: Option<f64>,
        total_opens: u64,
        current_streak: i64,
    ) -> Self {
        Self {
            total: tally.total,
            failures: tally.failures,
            failure_rate: tally.failure_rate(),
            last_opened_at,
            total_opens,
            current_streak,
        }
    }
}

impl Default for BreakerStats {
    fn default() -> Self {
        Self::new(WindowTally::default(), None, 0, 0)
    }
}

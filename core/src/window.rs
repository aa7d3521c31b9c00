//! Count-based sliding window of call outcomes
//!
//! Holds the most recent `capacity` outcomes recorded while the circuit is
//! closed. Appending past capacity evicts the oldest outcome first.

use crate::stats::WindowTally;
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

/// Bounded FIFO of outcomes (`true` = success, `false` = failure)
///
/// Shared through `Arc` between the breaker and its state machine's context,
/// where guards only see `&CircuitContext`.
#[derive(Debug)]
pub struct SlidingWindow {
    outcomes: RwLock<VecDeque<bool>>,
    capacity: usize,
}

impl SlidingWindow {
    /// Create an empty window holding at most `capacity` outcomes
    pub fn new(capacity: usize) -> Self {
        Self {
            outcomes: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    /// Append an outcome, evicting from the front while over capacity.
    /// With a capacity of zero every append is evicted immediately.
    pub fn record(&self, success: bool) {
        let mut outcomes = self.outcomes.write().unwrap_or_else(PoisonError::into_inner);
        outcomes.push_back(success);

        while outcomes.len() > self.capacity {
            outcomes.pop_front();
        }
    }

    /// Count total and failed outcomes currently held
    pub fn tally(&self) -> WindowTally {
        let outcomes = self.outcomes.read().unwrap_or_else(PoisonError::into_inner);
        WindowTally {
            total: outcomes.len(),
            failures: outcomes.iter().filter(|success| !**success).count(),
        }
    }

    /// Drop every recorded outcome
    pub fn clear(&self) {
        self.outcomes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.outcomes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

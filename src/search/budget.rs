//! Per-turn time budget.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Wall-clock budget for one move decision.
///
/// Created when the agent's turn starts and dropped once the move is
/// emitted. `cancel` is the cooperative stop signal polled by the search.
#[derive(Debug)]
pub struct TimeBudget {
    started: Instant,
    deadline: Instant,
    cancelled: AtomicBool,
}

impl TimeBudget {
    pub fn new(limit: Duration) -> TimeBudget {
        let started = Instant::now();
        TimeBudget {
            started,
            deadline: started + limit,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Returns true once the deadline has passed or the budget was cancelled.
    #[inline]
    pub fn expired(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || Instant::now() >= self.deadline
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

use std::time::Duration;

/// Retry pacing for durable writes. Delays double from `base` up to `cap`,
/// and the whole schedule is bounded by a sleep budget: once the budget would
/// be overdrawn, `next_delay` returns None and the caller flags the session
/// degraded instead of sleeping into the next request's time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistBackoff {
    base: Duration,
    cap: Duration,
    budget: Duration,
    spent: Duration,
    attempt: u32,
}

impl PersistBackoff {
    pub fn new(base: Duration, cap: Duration, budget: Duration) -> Self {
        Self {
            base,
            cap,
            budget,
            spent: Duration::ZERO,
            attempt: 0,
        }
    }

    /// Schedule sized to one store deadline: sleeps total well under the
    /// deadline so the writes themselves keep most of the budget
    pub fn for_durable_writes(deadline: Duration) -> Self {
        Self::new(deadline / 10, deadline / 2, deadline)
    }

    /// Next sleep before another attempt, or None once the budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        let doubled = self.base.saturating_mul(1u32 << self.attempt.min(16));
        let delay = doubled.min(self.cap);
        if self.spent + delay > self.budget {
            return None;
        }
        self.attempt += 1;
        self.spent += delay;
        Some(delay)
    }

    /// Attempts that were granted a delay so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Total sleep handed out, for the degraded-persist log line
    pub fn spent(&self) -> Duration {
        self.spent
    }
}

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RateLimitError {
    #[error("rate limit exceeded: {cap} per window")]
    LimitExceeded { cap: u32 },

    #[error("invalid rate limit configuration")]
    InvalidConfig,
}

/// Fixed-window counter with injected time. One instance guards one key;
/// the window resets `window_ms` after its first hit.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedWindow {
    window_ms: u64,
    cap: u32,
    window_start: u64,
    count: u32,
}

impl FixedWindow {
    pub fn new(window_ms: u64, cap: u32) -> Result<Self, RateLimitError> {
        if window_ms == 0 || cap == 0 {
            return Err(RateLimitError::InvalidConfig);
        }
        Ok(Self {
            window_ms,
            cap,
            window_start: 0,
            count: 0,
        })
    }

    fn roll(&mut self, now_ms: u64) {
        if now_ms.saturating_sub(self.window_start) >= self.window_ms {
            self.window_start = now_ms;
            self.count = 0;
        }
    }

    /// Count a hit. Returns the count within the current window, or an error
    /// once the cap is reached.
    pub fn try_increment(&mut self, now_ms: u64) -> Result<u32, RateLimitError> {
        self.roll(now_ms);
        if self.count >= self.cap {
            return Err(RateLimitError::LimitExceeded { cap: self.cap });
        }
        self.count += 1;
        Ok(self.count)
    }

    pub fn count(&mut self, now_ms: u64) -> u32 {
        self.roll(now_ms);
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_within_window() {
        let mut window = FixedWindow::new(60_000, 30).unwrap();
        for i in 1..=30 {
            assert_eq!(window.try_increment(1_000 + i), Ok(i as u32));
        }
        assert_eq!(
            window.try_increment(2_000),
            Err(RateLimitError::LimitExceeded { cap: 30 })
        );
    }

    #[test]
    fn test_window_resets() {
        let mut window = FixedWindow::new(60_000, 2).unwrap();
        window.try_increment(0).unwrap();
        window.try_increment(100).unwrap();
        assert!(window.try_increment(59_999).is_err());

        // New window
        assert_eq!(window.try_increment(60_000), Ok(1));
    }

    #[test]
    fn test_rejects_degenerate_config() {
        assert_eq!(FixedWindow::new(0, 30).unwrap_err(), RateLimitError::InvalidConfig);
        assert_eq!(FixedWindow::new(60_000, 0).unwrap_err(), RateLimitError::InvalidConfig);
    }

    #[test]
    fn test_count_reads_without_incrementing() {
        let mut window = FixedWindow::new(60_000, 5).unwrap();
        window.try_increment(10).unwrap();
        window.try_increment(20).unwrap();
        assert_eq!(window.count(30), 2);
        assert_eq!(window.count(70_000), 0);
    }
}

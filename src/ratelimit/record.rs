//! Per-identifier counting record.

use std::time::{Duration, Instant};

/// One caller's current window: how many attempts have been seen and
/// when the window ends.
///
/// Records are owned exclusively by the window store, which keys them by
/// the caller's identifier. A record counts every attempt made while its
/// window is live, admitted or rejected; the count keeps growing past the
/// limit inside a denied window, which has no effect on verdicts but
/// mirrors what callers observe in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterRecord {
    /// Attempts seen in the current window
    count: u64,
    /// Absolute end of the current window
    window_expires_at: Instant,
}

impl CounterRecord {
    /// Create the record for a window opening at `now`.
    ///
    /// The creating request is the first attempt, so the count starts at 1.
    pub fn new(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            window_expires_at: now + window,
        }
    }

    /// Register one more attempt in the current window.
    ///
    /// Must only be called while the window is live; an expired record is
    /// replaced whole, never incremented.
    pub fn register_hit(&mut self) {
        self.count += 1;
    }

    /// Whether the window has passed as of `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.window_expires_at
    }

    /// Attempts seen in the current window.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// When the current window ends.
    pub fn window_expires_at(&self) -> Instant {
        self.window_expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_counts_the_creating_attempt() {
        let now = Instant::now();
        let record = CounterRecord::new(now, Duration::from_secs(60));

        assert_eq!(record.count(), 1);
        assert_eq!(record.window_expires_at(), now + Duration::from_secs(60));
    }

    #[test]
    fn register_hit_increments_count() {
        let now = Instant::now();
        let mut record = CounterRecord::new(now, Duration::from_secs(60));

        record.register_hit();
        record.register_hit();

        assert_eq!(record.count(), 3);
        // Incrementing never touches the window boundary
        assert_eq!(record.window_expires_at(), now + Duration::from_secs(60));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = Instant::now();
        let record = CounterRecord::new(now, Duration::from_millis(500));

        assert!(!record.is_expired(now));
        assert!(!record.is_expired(now + Duration::from_millis(499)));
        // The window is over the moment now reaches the boundary
        assert!(record.is_expired(now + Duration::from_millis(500)));
        assert!(record.is_expired(now + Duration::from_millis(501)));
    }
}

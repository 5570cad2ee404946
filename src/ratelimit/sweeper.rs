//! Background eviction of expired rate limit windows.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{trace, warn};

use super::limiter::RateLimiter;

/// Default period between eviction passes, independent of any window
/// duration.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Handle to a running sweeper task.
///
/// The task stops when [`SweeperHandle::shutdown`] is called or the
/// handle is dropped, so holding the handle for the process lifetime and
/// dropping it on shutdown gives a clean exit.
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Spawn a sweeper for `limiter` that evicts expired records every
    /// `period`.
    pub fn spawn(limiter: Arc<RateLimiter>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so passes
            // run a full period after spawn.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                // A failed pass must not take the task down with it; log
                // and keep the schedule.
                match catch_unwind(AssertUnwindSafe(|| limiter.sweep())) {
                    Ok(evicted) => trace!(evicted = evicted, "Sweep pass complete"),
                    Err(_) => warn!("Sweep pass panicked, continuing with next cycle"),
                }
            }
        });

        Self { task }
    }

    /// Spawn a sweeper with the default one-minute period.
    pub fn spawn_default(limiter: Arc<RateLimiter>) -> Self {
        Self::spawn(limiter, DEFAULT_SWEEP_INTERVAL)
    }

    /// Stop the sweeper task.
    pub fn shutdown(&self) {
        self.task.abort();
    }

    /// Whether the sweeper task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ratelimit::limiter::LimitPolicy;

    fn limiter_with_clock(window_ms: u64) -> (Arc<RateLimiter>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let policy = LimitPolicy::new(5, Duration::from_millis(window_ms)).unwrap();
        (
            Arc::new(RateLimiter::with_clock(policy, clock.clone())),
            clock,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_expired_records_without_further_checks() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let (limiter, clock) = limiter_with_clock(500);
        limiter.check("ip:stale");
        assert_eq!(limiter.tracked_identifiers(), 1);

        let _handle = SweeperHandle::spawn(limiter.clone(), Duration::from_secs(1));

        // Let the window pass, then let one sweep period elapse
        clock.advance(Duration::from_millis(600));
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(limiter.tracked_identifiers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_keeps_live_records() {
        let (limiter, clock) = limiter_with_clock(60_000);
        limiter.check("ip:live");

        let _handle = SweeperHandle::spawn(limiter.clone(), Duration::from_secs(1));

        clock.advance(Duration::from_millis(600));
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(limiter.tracked_identifiers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_task() {
        let (limiter, _clock) = limiter_with_clock(500);
        let handle = SweeperHandle::spawn(limiter, Duration::from_secs(1));

        handle.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(handle.is_finished());
    }
}

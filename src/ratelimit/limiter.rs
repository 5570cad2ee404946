//! Core rate limiter implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TurnstileError};

use super::store::WindowStore;

/// Default number of requests allowed per window.
const DEFAULT_LIMIT: u64 = 100;
/// Default window duration.
const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// How many requests an identifier may make within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    /// Maximum requests allowed in the window
    limit: u64,
    /// Duration of the window
    window: Duration,
}

impl LimitPolicy {
    /// Create a policy, rejecting a zero limit or zero window.
    ///
    /// A non-positive limit or window is a programming error in the
    /// caller, so it fails here rather than being clamped at check time.
    pub fn new(limit: u64, window: Duration) -> Result<Self> {
        if limit == 0 {
            return Err(TurnstileError::Policy("limit must be positive".into()));
        }
        if window.is_zero() {
            return Err(TurnstileError::Policy("window must be positive".into()));
        }
        Ok(Self { limit, window })
    }

    /// Maximum requests allowed in the window.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Duration of the window.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window: DEFAULT_WINDOW,
        }
    }
}

/// The outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the request should be admitted
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u64,
    /// When the current window ends and the count resets
    pub reset_at: Instant,
}

impl Verdict {
    /// How long the caller should wait before retrying, as of `now`.
    ///
    /// Zero once the window has already rolled over. The HTTP layer uses
    /// this to populate retry headers on denials.
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }
}

/// Fixed-window rate limiter for one class of protected requests.
///
/// Counts requests per caller identifier within a window of fixed
/// duration and denies once the count exceeds the policy's limit. A
/// caller can issue up to `limit` requests at the very end of one window
/// and `limit` more right after it rolls over; that boundary burst is
/// inherent to fixed-window counting and accepted here.
///
/// This struct is thread-safe and can be shared across tasks.
pub struct RateLimiter {
    /// Per-identifier window state
    store: WindowStore,
    /// Policy applied by `check`
    policy: LimitPolicy,
    /// Injected time source
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter reading the system clock.
    pub fn new(policy: LimitPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Create a limiter with an explicit time source.
    pub fn with_clock(policy: LimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: WindowStore::new(),
            policy,
            clock,
        }
    }

    /// Check one request for `identifier` against the limiter's policy.
    pub fn check(&self, identifier: &str) -> Verdict {
        self.check_with(identifier, &self.policy)
    }

    /// Check one request for `identifier` against a per-call policy.
    ///
    /// The counter is shared with [`RateLimiter::check`]; only the limit
    /// and the duration of newly opened windows come from `policy`.
    pub fn check_with(&self, identifier: &str, policy: &LimitPolicy) -> Verdict {
        let now = self.clock.now();
        let record = self.store.record_hit(identifier, now, policy.window());

        if record.count() == 1 {
            debug!(
                identifier = %identifier,
                limit = policy.limit(),
                window_ms = policy.window().as_millis() as u64,
                "Opening new rate limit window"
            );
        }

        let allowed = record.count() <= policy.limit();
        let remaining = policy.limit().saturating_sub(record.count());

        if !allowed {
            debug!(
                identifier = %identifier,
                count = record.count(),
                "Rate limit exceeded"
            );
        }

        trace!(
            identifier = %identifier,
            count = record.count(),
            allowed = allowed,
            remaining = remaining,
            "Rate limit check"
        );

        Verdict {
            allowed,
            remaining,
            reset_at: record.window_expires_at(),
        }
    }

    /// Evict every record whose window has passed.
    ///
    /// Returns the number of records removed. The background sweeper runs
    /// this once per period; `check` itself never iterates the store.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;

        for identifier in self.store.identifiers() {
            if self.store.remove_if_expired(&identifier, now) {
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(
                evicted = evicted,
                tracked = self.store.len(),
                "Swept expired rate limit windows"
            );
        }

        evicted
    }

    /// Policy applied by `check`.
    pub fn policy(&self) -> &LimitPolicy {
        &self.policy
    }

    /// Number of caller identifiers currently tracked.
    pub fn tracked_identifiers(&self) -> usize {
        self.store.len()
    }

    /// Drop all window state.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.store.clear();
    }
}

//! Rate limiting logic and state management.

mod limiter;
mod record;
mod rules;
mod store;
mod sweeper;

pub use limiter::{LimitPolicy, RateLimiter, Verdict};
pub use record::CounterRecord;
pub use rules::{EndpointRule, LimiterRegistry, RulesConfig, TimeUnit};
pub use store::WindowStore;
pub use sweeper::{SweeperHandle, DEFAULT_SWEEP_INTERVAL};

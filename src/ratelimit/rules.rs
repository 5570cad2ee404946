//! Per-endpoint rate limit rules.
//!
//! Protected endpoints declare their limits in a YAML document; the rules
//! compile into one independent limiter per endpoint, so exhausting the
//! payment endpoint's quota leaves the coupon endpoint's untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TurnstileError};

use super::limiter::{LimitPolicy, RateLimiter};
use super::sweeper::SweeperHandle;

/// A complete rules document mapping endpoint names to their limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Map of endpoint name to its rule
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointRule>,
}

/// A rate limit rule specifying the limit and time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointRule {
    /// Number of requests allowed per unit of time
    pub requests_per_unit: u64,
    /// The time unit
    pub unit: TimeUnit,
    /// Optional name/description for this limit
    #[serde(default)]
    pub name: Option<String>,
}

/// Time unit for rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Get the duration of this time unit.
    pub fn duration(&self) -> Duration {
        match self {
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
            TimeUnit::Day => Duration::from_secs(86400),
        }
    }
}

impl EndpointRule {
    /// Compile the rule into a validated limit policy.
    pub fn policy(&self) -> Result<LimitPolicy> {
        LimitPolicy::new(self.requests_per_unit, self.unit.duration())
    }
}

impl RulesConfig {
    /// Create an empty rules document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load rules from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            TurnstileError::Config(format!("Failed to parse rate limit rules: {}", e))
        })
    }

    /// Get the rule for an endpoint.
    pub fn rule(&self, endpoint: &str) -> Option<&EndpointRule> {
        self.endpoints.get(endpoint)
    }
}

/// One independent limiter per configured endpoint.
///
/// Built once at startup from a [`RulesConfig`]; the HTTP layer looks up
/// the limiter for the endpoint it is serving and calls `check` with the
/// caller's identifier.
pub struct LimiterRegistry {
    limiters: HashMap<String, Arc<RateLimiter>>,
}

impl LimiterRegistry {
    /// Build a registry from rules, one limiter per endpoint.
    pub fn from_rules(rules: &RulesConfig) -> Result<Self> {
        Self::with_clock(rules, Arc::new(SystemClock))
    }

    /// Build a registry with an explicit time source shared by all
    /// limiters.
    pub fn with_clock(rules: &RulesConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut limiters = HashMap::new();

        for (endpoint, rule) in &rules.endpoints {
            let policy = rule.policy().map_err(|e| {
                TurnstileError::Config(format!("Invalid rule for endpoint {}: {}", endpoint, e))
            })?;
            limiters.insert(
                endpoint.clone(),
                Arc::new(RateLimiter::with_clock(policy, clock.clone())),
            );
        }

        Ok(Self { limiters })
    }

    /// The limiter for an endpoint, if one is configured.
    pub fn limiter(&self, endpoint: &str) -> Option<&Arc<RateLimiter>> {
        self.limiters.get(endpoint)
    }

    /// Names of the endpoints with a configured limiter.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.limiters.keys().map(String::as_str)
    }

    /// Number of registered limiters.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Whether the registry has no limiters.
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Start a sweeper for every registered limiter.
    ///
    /// The returned handles stop their tasks when dropped.
    pub fn spawn_sweepers(&self, period: Duration) -> Vec<SweeperHandle> {
        self.limiters
            .values()
            .map(|limiter| SweeperHandle::spawn(limiter.clone(), period))
            .collect()
    }
}

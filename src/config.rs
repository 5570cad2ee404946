//! Configuration management for turnstile.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::ratelimit::LimitPolicy;

/// Settings for the limiters guarding the box-office API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterSettings {
    /// Requests allowed per window when no endpoint rule applies
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Window duration in seconds when no endpoint rule applies
    #[serde(default = "default_window_secs")]
    pub default_window_secs: u64,

    /// Seconds between sweeper eviction passes
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Path to the endpoint rules file
    pub rules_path: Option<String>,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            rules_path: None,
        }
    }
}

fn default_limit() -> u64 {
    100
}

fn default_window_secs() -> u64 {
    900
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl LimiterSettings {
    /// Load settings from a file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: LimiterSettings = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::TurnstileError::Config(e.to_string()))?;
        Ok(settings)
    }

    /// The fallback policy described by these settings.
    pub fn default_policy(&self) -> Result<LimitPolicy> {
        LimitPolicy::new(self.default_limit, Duration::from_secs(self.default_window_secs))
    }

    /// The sweep period described by these settings.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = LimiterSettings::default();
        assert_eq!(settings.default_limit, 100);
        assert_eq!(settings.default_window_secs, 900);
        assert_eq!(settings.sweep_interval_secs, 60);
        assert!(settings.rules_path.is_none());

        let policy = settings.default_policy().unwrap();
        assert_eq!(policy.limit(), 100);
        assert_eq!(policy.window(), Duration::from_secs(900));
        assert_eq!(settings.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn partial_documents_fall_back_to_defaults() {
        let settings: LimiterSettings =
            serde_yaml::from_str("default_limit: 25\nrules_path: conf/rules.yaml\n").unwrap();

        assert_eq!(settings.default_limit, 25);
        assert_eq!(settings.default_window_secs, 900);
        assert_eq!(settings.sweep_interval_secs, 60);
        assert_eq!(settings.rules_path.as_deref(), Some("conf/rules.yaml"));
    }
}

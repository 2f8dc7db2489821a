//! Scenario configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default upper bound on replays of one scenario
pub const DEFAULT_MAX_REPLAYS: usize = 10_000;

/// What to do when a replay's body panics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Propagate the first panic immediately
    #[default]
    Abort,

    /// Keep exploring the remaining paths, then re-raise the first panic
    ContinueThenReport,
}

/// Scenario configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Replays allowed before exploration is declared runaway
    pub max_replays: usize,
    /// Handling of panicking replays
    pub failure_policy: FailurePolicy,
    /// Check ledger consistency after every replay
    pub verify_ledger: bool,
    /// Emit a debug event for every block entered
    pub log_blocks: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            max_replays: DEFAULT_MAX_REPLAYS,
            failure_policy: FailurePolicy::Abort,
            verify_ledger: cfg!(debug_assertions),
            log_blocks: true,
        }
    }
}

impl ScenarioConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With replay bound
    #[inline]
    #[must_use]
    pub fn with_max_replays(mut self, max: usize) -> Self {
        self.max_replays = max;
        self
    }

    /// With failure policy
    #[inline]
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// With or without per-replay ledger verification
    #[inline]
    #[must_use]
    pub fn with_ledger_verification(mut self, enabled: bool) -> Self {
        self.verify_ledger = enabled;
        self
    }

    /// With or without per-block debug events
    #[inline]
    #[must_use]
    pub fn with_block_logging(mut self, enabled: bool) -> Self {
        self.log_blocks = enabled;
        self
    }

    /// Parse from TOML; missing keys take their defaults
    ///
    /// # Errors
    /// Returns error on malformed TOML or an invalid value.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] if `max_replays` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_replays == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_replays",
                reason: "at least one replay is required".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_is_valid() {
        let config = ScenarioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_replays, DEFAULT_MAX_REPLAYS);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn config_builders() {
        let config = ScenarioConfig::new()
            .with_max_replays(5)
            .with_failure_policy(FailurePolicy::ContinueThenReport)
            .with_ledger_verification(true)
            .with_block_logging(false);

        assert_eq!(config.max_replays, 5);
        assert_eq!(config.failure_policy, FailurePolicy::ContinueThenReport);
        assert!(config.verify_ledger);
        assert!(!config.log_blocks);
    }

    #[test]
    fn config_from_toml_partial() {
        let config = ScenarioConfig::from_toml_str(
            r#"
            max_replays = 64
            failure_policy = "continue_then_report"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_replays, 64);
        assert_eq!(config.failure_policy, FailurePolicy::ContinueThenReport);
        assert!(config.log_blocks);
    }

    #[test]
    fn config_from_toml_rejects_zero_replays() {
        let result = ScenarioConfig::from_toml_str("max_replays = 0");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "max_replays", .. })
        ));
    }

    #[test]
    fn config_from_toml_rejects_garbage() {
        let result = ScenarioConfig::from_toml_str("failure_policy = \"sometimes\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}

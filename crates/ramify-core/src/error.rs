//! Error types for scenario exploration
//!
//! Three families of failure exist:
//! - Usage errors: the scenario is structured incorrectly
//! - Internal errors: the exploration bookkeeping is inconsistent
//! - Body failures: panics raised by the author's own code, never wrapped here

use crate::identity::ForkSite;
use crate::registry::HostTestId;

/// Main scenario error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScenarioError {
    /// A block was entered with no scenario running for the host test
    #[error("no active scenario for host test {host}")]
    NoActiveScenario { host: HostTestId },

    /// A scenario was started while another one is running for the same host test
    #[error("scenario already active for host test {host}; scenarios cannot be nested")]
    ScenarioAlreadyActive { host: HostTestId },

    /// A fork was declared inside an assertion block
    #[error("fork at {site} is nested inside an assertion block")]
    ForkInsideAssertion { site: ForkSite },

    /// Two branches of one fork share a name
    #[error("duplicate branch name '{name}' in fork at {site}")]
    DuplicateBranchName { name: String, site: ForkSite },

    /// Ledger bookkeeping is inconsistent
    #[error("exploration ledger corrupted: {0}")]
    LedgerCorrupted(String),

    /// The replay loop hit its configured bound
    #[error("replay limit of {limit} exceeded")]
    ReplayLimitExceeded { limit: usize },

    /// A replay changed nothing while unexplored paths remain
    #[error("exploration stalled with {open} unexplored path(s); is the scenario body deterministic?")]
    ExplorationStalled { open: usize },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ScenarioError {
    /// Structural mistake in the test itself
    #[inline]
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::NoActiveScenario { .. }
                | Self::ScenarioAlreadyActive { .. }
                | Self::ForkInsideAssertion { .. }
                | Self::DuplicateBranchName { .. }
                | Self::Config(_)
        )
    }

    /// Defect in the exploration engine or a nondeterministic body
    #[inline]
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::LedgerCorrupted(_) | Self::ReplayLimitExceeded { .. } | Self::ExplorationStalled { .. }
        )
    }

    /// Create a ledger corruption error
    #[inline]
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::LedgerCorrupted(message.into())
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("invalid toml: {0}")]
    Parse(String),

    /// A field holds an unusable value
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for scenario operations
pub type ScenarioResult<T> = Result<T, ScenarioError>;

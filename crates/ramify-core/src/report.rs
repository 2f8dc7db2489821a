//! Exploration reports
//!
//! A [`ScenarioReport`] lists, for every replay, the branches it took.

use crate::identity::BranchId;
use crate::scenario::ReplayId;
use serde::{Deserialize, Serialize};

/// One branch taken during a replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchChoice {
    /// Branch identity
    pub id: BranchId,
    /// Declared branch name
    pub name: String,
}

/// What happened during one replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// 1-based position within the scenario
    pub ordinal: usize,
    /// Process-wide replay identifier
    pub replay_id: ReplayId,
    /// Branches entered, in execution order
    pub choices: Vec<BranchChoice>,
    /// The body panicked (only recorded when exploration continues past failures)
    pub failed: bool,
}

impl ReplayRecord {
    /// Names of the branches entered
    #[must_use]
    pub fn branch_names(&self) -> Vec<&str> {
        self.choices.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Outcome of exploring a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario title
    pub title: String,
    /// Replays in execution order
    pub replays: Vec<ReplayRecord>,
}

impl ScenarioReport {
    /// Create empty report
    #[inline]
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            replays: Vec::new(),
        }
    }

    /// Number of replays performed
    #[inline]
    #[must_use]
    pub fn replay_count(&self) -> usize {
        self.replays.len()
    }

    /// Number of replays whose body panicked
    #[inline]
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.replays.iter().filter(|r| r.failed).count()
    }

    /// No replay failed
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Branch names per replay
    #[must_use]
    pub fn branch_names(&self) -> Vec<Vec<String>> {
        self.replays
            .iter()
            .map(|r| r.choices.iter().map(|c| c.name.clone()).collect())
            .collect()
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

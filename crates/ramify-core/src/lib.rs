//! Ramify Core
//!
//! Replay-driven exploration of branching test scenarios.
//!
//! # Overview
//!
//! A scenario body declares forks, each with named branches. The body is
//! replayed until every combination reachable through the forks has been
//! taken exactly once:
//! - **BranchId**: stable identity of a branch, hashed from its fork site and name
//! - **BranchPath**: the branch identities taken so far on a replay
//! - **Ledger**: per-scenario record of explored and pending paths
//! - **BranchSelector**: picks the branch to enter at each fork
//! - **Scenario**: the replay loop, handing a [`Replay`] context to the body
//! - **ScenarioRegistry**: finds the active scenario of a host test
//!
//! # Example
//!
//! ```rust
//! use ramify_core::{Branch, Scenario};
//!
//! let report = Scenario::new("refund").run(|replay| {
//!     replay.fork([
//!         Branch::new("full", |replay| {
//!             replay.fork([Branch::new("card", |_| {}), Branch::new("wallet", |_| {})]);
//!         }),
//!         Branch::new("partial", |replay| {
//!             replay.check("amount is reduced", |_| {});
//!         }),
//!     ]);
//! });
//!
//! assert_eq!(report.replay_count(), 3);
//! ```

#![warn(missing_docs)]

pub mod ambient;
pub mod config;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod logging;
pub mod path;
pub mod registry;
pub mod report;
pub mod scenario;
pub mod selector;

// Re-exports
pub use config::{FailurePolicy, ScenarioConfig};
pub use error::{ConfigError, ScenarioError, ScenarioResult};
pub use identity::{branch_id, BranchId, ForkSite};
pub use ledger::{Ledger, Summary};
pub use path::BranchPath;
pub use registry::{HostTestId, Registration, ScenarioRegistry};
pub use report::{BranchChoice, ReplayRecord, ScenarioReport};
pub use scenario::{
    BlockKind, Branch, ForkDecision, Replay, ReplayId, Scenario, ScenarioHandle, ScenarioState,
};
pub use selector::{BranchSelector, Visit};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing scenarios
    pub use crate::{
        Branch, FailurePolicy, ForkSite, HostTestId, Replay, Scenario, ScenarioConfig,
        ScenarioError, ScenarioReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

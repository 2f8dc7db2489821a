//! Free-function authoring surface
//!
//! Blocks written with these functions find their scenario through the
//! global [`ScenarioRegistry`], keyed by the calling thread, so helpers can
//! declare forks without being handed a [`Replay`]. Every block must run on
//! the thread that started the scenario.
//!
//! ```rust
//! use ramify_core::ambient::{act, branch, check, fork, scenario};
//!
//! scenario("login", |_replay_id| {
//!     act("open form", || {});
//!     fork([
//!         branch("valid password", || check("lands on dashboard", || {})),
//!         branch("wrong password", || check("shows error", || {})),
//!     ]);
//! });
//! ```

use crate::identity::ForkSite;
use crate::registry::{HostTestId, ScenarioRegistry};
use crate::report::ScenarioReport;
use crate::scenario::{abort, Branch, Replay, ReplayId, Scenario};

/// Run a scenario owned by the calling thread
///
/// # Panics
/// See [`Scenario::run`].
pub fn scenario(title: &str, mut body: impl FnMut(ReplayId)) -> ScenarioReport {
    Scenario::new(title).run(|replay| body(replay.id()))
}

/// Structural block
///
/// # Panics
/// If no scenario is running on this thread.
pub fn act<R>(name: &str, body: impl FnOnce() -> R) -> R {
    current().act(name, |_| body())
}

/// Assertion block; forks are not allowed inside it
///
/// # Panics
/// If no scenario is running on this thread.
pub fn check<R>(label: &str, body: impl FnOnce() -> R) -> R {
    current().check(label, |_| body())
}

/// Fork identified by the caller's source position
///
/// # Panics
/// If no scenario is running on this thread, or on a usage error.
#[track_caller]
pub fn fork<'b>(branches: impl IntoIterator<Item = Branch<'b>>) {
    let site = ForkSite::caller();
    current().fork_at(site, branches);
}

/// Fork identified by an explicit label
///
/// # Panics
/// Same as [`fork`].
pub fn fork_labeled<'b>(label: &str, branches: impl IntoIterator<Item = Branch<'b>>) {
    current().fork_at(ForkSite::labeled(label), branches);
}

/// Branch whose body takes no context
pub fn branch<'b>(name: impl Into<String>, body: impl FnOnce() + 'b) -> Branch<'b> {
    Branch::new(name, move |_| body())
}

/// Context of the replay running on this thread
///
/// # Panics
/// If no scenario is running on this thread, unwinding with
/// [`ScenarioError::NoActiveScenario`](crate::ScenarioError::NoActiveScenario)
/// as payload so an enclosing replay loop reports it as a usage error.
#[must_use]
pub fn current() -> Replay {
    let host = HostTestId::current();
    match ScenarioRegistry::global().lookup(&host) {
        Ok(handle) => Replay::attach(handle),
        Err(err) => abort(err),
    }
}

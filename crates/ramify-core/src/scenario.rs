//! Scenarios and the replay loop
//!
//! A [`Scenario`] runs its body repeatedly. Each run is a replay, handed a
//! [`Replay`] context through which the body declares activity blocks,
//! forks and assertion blocks. Every fork enters exactly one branch per
//! replay; the loop stops once the ledger has nothing left open.
//!
//! # Example
//!
//! ```rust
//! use ramify_core::{Branch, Scenario};
//!
//! let report = Scenario::new("checkout").run(|replay| {
//!     replay.act("fill cart", |_| {});
//!     replay.fork([
//!         Branch::new("pay by card", |_| {}),
//!         Branch::new("pay by invoice", |_| {}),
//!     ]);
//! });
//! assert_eq!(report.replay_count(), 2);
//! ```

use crate::config::{FailurePolicy, ScenarioConfig};
use crate::error::{ScenarioError, ScenarioResult};
use crate::identity::{BranchId, ForkSite};
use crate::ledger::Ledger;
use crate::path::BranchPath;
use crate::registry::{HostTestId, ScenarioRegistry};
use crate::report::{BranchChoice, ReplayRecord, ScenarioReport};
use crate::selector::BranchSelector;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static REPLAY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-wide replay identifier
///
/// Unique across every replay of every scenario in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplayId(u64);

impl ReplayId {
    /// Allocate the next identifier
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(REPLAY_COUNTER.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Wrap a raw value
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared handle to a scenario's state
pub type ScenarioHandle = Arc<Mutex<ScenarioState>>;

/// Branch entered by a fork on the current replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkDecision {
    /// Index of the entered branch in declaration order
    pub index: usize,
    /// Cursor to restore once the branch body finishes
    pub parent: BranchPath,
}

/// State of one scenario invocation
///
/// The ledger survives across replays; everything else is reset by
/// [`ScenarioState::begin_replay`].
#[derive(Debug)]
pub struct ScenarioState {
    title: String,
    config: ScenarioConfig,
    replay_id: ReplayId,
    ordinal: usize,
    cursor: BranchPath,
    ledger: Ledger,
    assertion_depth: usize,
    choices: Vec<BranchChoice>,
}

impl ScenarioState {
    /// Create state for a scenario that has not replayed yet
    #[must_use]
    pub fn new(title: impl Into<String>, config: ScenarioConfig) -> Self {
        Self {
            title: title.into(),
            config,
            replay_id: ReplayId::from_raw(0),
            ordinal: 0,
            cursor: BranchPath::root(),
            ledger: Ledger::new(),
            assertion_depth: 0,
            choices: Vec::new(),
        }
    }

    /// Scenario title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Identifier of the current replay
    #[inline]
    #[must_use]
    pub fn replay_id(&self) -> ReplayId {
        self.replay_id
    }

    /// 1-based ordinal of the current replay (0 before the first)
    #[inline]
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Current path
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> &BranchPath {
        &self.cursor
    }

    /// Exploration ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Start a new replay: fresh id, cursor back at the root
    pub fn begin_replay(&mut self) -> ReplayId {
        self.replay_id = ReplayId::next();
        self.ordinal += 1;
        self.cursor = BranchPath::root();
        self.assertion_depth = 0;
        self.choices.clear();
        self.replay_id
    }

    /// Decide which branch of a fork to enter
    ///
    /// On `Some`, the cursor has moved onto the entered branch.
    ///
    /// # Errors
    /// Returns a usage error for a fork inside an assertion block or for
    /// duplicate branch names, and propagates ledger corruption.
    pub fn choose(&mut self, site: &ForkSite, names: &[&str]) -> ScenarioResult<Option<ForkDecision>> {
        if self.assertion_depth > 0 {
            return Err(ScenarioError::ForkInsideAssertion { site: site.clone() });
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in names {
            if !seen.insert(*name) {
                return Err(ScenarioError::DuplicateBranchName {
                    name: (*name).to_string(),
                    site: site.clone(),
                });
            }
        }

        let ids: Vec<BranchId> = names.iter().map(|name| BranchId::derive(site, name)).collect();
        let parent = self.cursor.clone();
        let chosen = BranchSelector::new(&mut self.cursor, &mut self.ledger).select(&ids)?;

        Ok(chosen.map(|index| {
            self.choices.push(BranchChoice {
                id: ids[index],
                name: names[index].to_string(),
            });
            ForkDecision { index, parent }
        }))
    }

    /// Move the cursor back after a branch body
    #[inline]
    pub fn restore_cursor(&mut self, parent: BranchPath) {
        self.cursor = parent;
    }

    fn take_choices(&mut self) -> Vec<BranchChoice> {
        std::mem::take(&mut self.choices)
    }
}

/// Kind of block being entered, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Structural activity block
    Act,
    /// Branch of a fork
    Branch,
    /// Assertion block
    Check,
}

impl BlockKind {
    /// Short name used in log fields
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Act => "act",
            Self::Branch => "branch",
            Self::Check => "check",
        }
    }
}

/// A named alternative within a fork
pub struct Branch<'b> {
    name: String,
    body: Box<dyn FnOnce(&Replay) + 'b>,
}

impl<'b> Branch<'b> {
    /// Create branch
    #[must_use]
    pub fn new(name: impl Into<String>, body: impl FnOnce(&Replay) + 'b) -> Self {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    /// Declared name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Branch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Context of one replay, handed to the scenario body
#[derive(Debug, Clone)]
pub struct Replay {
    handle: ScenarioHandle,
    id: ReplayId,
    ordinal: usize,
    log_blocks: bool,
}

impl Replay {
    pub(crate) fn attach(handle: ScenarioHandle) -> Self {
        let (id, ordinal, log_blocks) = {
            let state = handle.lock();
            (state.replay_id, state.ordinal, state.config.log_blocks)
        };
        Self {
            handle,
            id,
            ordinal,
            log_blocks,
        }
    }

    /// Process-wide identifier of this replay
    #[inline]
    #[must_use]
    pub fn id(&self) -> ReplayId {
        self.id
    }

    /// 1-based position of this replay within the scenario
    #[inline]
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Current branch path
    #[must_use]
    pub fn path(&self) -> BranchPath {
        self.handle.lock().cursor.clone()
    }

    /// Structural block; runs `body` with no effect on exploration
    pub fn act<R>(&self, name: &str, body: impl FnOnce(&Self) -> R) -> R {
        self.log(BlockKind::Act, name);
        body(self)
    }

    /// Assertion block; forks are not allowed anywhere inside it
    pub fn check<R>(&self, label: &str, body: impl FnOnce(&Self) -> R) -> R {
        self.log(BlockKind::Check, label);
        let _scope = AssertionScope::enter(&self.handle);
        body(self)
    }

    /// Fork identified by the caller's source position
    ///
    /// Enters exactly one branch on this replay, or none if every branch
    /// is already explored.
    ///
    /// # Panics
    /// Aborts the replay on a usage error (duplicate branch names, fork
    /// inside an assertion block).
    #[track_caller]
    pub fn fork<'b>(&self, branches: impl IntoIterator<Item = Branch<'b>>) {
        self.fork_at(ForkSite::caller(), branches);
    }

    /// Fork identified by an explicit site
    ///
    /// # Panics
    /// Same as [`Replay::fork`].
    pub fn fork_at<'b>(&self, site: ForkSite, branches: impl IntoIterator<Item = Branch<'b>>) {
        if let Err(err) = self.enter_fork(&site, branches.into_iter().collect()) {
            abort(err);
        }
    }

    fn enter_fork(&self, site: &ForkSite, mut branches: Vec<Branch<'_>>) -> ScenarioResult<()> {
        let decision = {
            let names: Vec<&str> = branches.iter().map(Branch::name).collect();
            self.handle.lock().choose(site, &names)?
        };
        let Some(decision) = decision else {
            return Ok(());
        };

        let branch = branches.swap_remove(decision.index);
        self.log(BlockKind::Branch, branch.name());

        let _restore = CursorRestore {
            handle: &self.handle,
            parent: decision.parent,
        };
        (branch.body)(self);
        Ok(())
    }

    fn log(&self, kind: BlockKind, name: &str) {
        if self.log_blocks {
            tracing::debug!(replay = %self.id, block = kind.as_str(), name, "entering block");
        }
    }
}

/// Restores the cursor when a branch body exits, normally or not
struct CursorRestore<'h> {
    handle: &'h ScenarioHandle,
    parent: BranchPath,
}

impl Drop for CursorRestore<'_> {
    fn drop(&mut self) {
        let parent = std::mem::take(&mut self.parent);
        self.handle.lock().restore_cursor(parent);
    }
}

struct AssertionScope<'h> {
    handle: &'h ScenarioHandle,
}

impl<'h> AssertionScope<'h> {
    fn enter(handle: &'h ScenarioHandle) -> Self {
        handle.lock().assertion_depth += 1;
        Self { handle }
    }
}

impl Drop for AssertionScope<'_> {
    fn drop(&mut self) {
        let mut state = self.handle.lock();
        state.assertion_depth = state.assertion_depth.saturating_sub(1);
    }
}

/// Abort the current replay with a usage or internal error
///
/// The error travels as the panic payload and is turned back into `Err` by
/// [`Scenario::try_run`].
pub(crate) fn abort(err: ScenarioError) -> ! {
    tracing::error!(error = %err, "aborting replay");
    panic::panic_any(err)
}

/// Builder and entry point for one scenario
#[derive(Debug)]
pub struct Scenario<'r> {
    title: String,
    host: HostTestId,
    config: ScenarioConfig,
    registry: &'r ScenarioRegistry,
}

impl Scenario<'static> {
    /// Scenario owned by the calling thread, registered globally
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            host: HostTestId::current(),
            config: ScenarioConfig::default(),
            registry: ScenarioRegistry::global(),
        }
    }
}

impl<'r> Scenario<'r> {
    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: ScenarioConfig) -> Self {
        self.config = config;
        self
    }

    /// With explicit host test identity
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: HostTestId) -> Self {
        self.host = host;
        self
    }

    /// Register in `registry` instead of the global one
    #[inline]
    #[must_use]
    pub fn with_registry<'n>(self, registry: &'n ScenarioRegistry) -> Scenario<'n> {
        Scenario {
            title: self.title,
            host: self.host,
            config: self.config,
            registry,
        }
    }

    /// Explore every branch combination, panicking on any scenario error
    ///
    /// # Panics
    /// On any [`ScenarioError`], and whenever the body panics (immediately
    /// under [`FailurePolicy::Abort`], after exploration otherwise).
    pub fn run<F>(self, body: F) -> ScenarioReport
    where
        F: FnMut(&Replay),
    {
        let registry = self.registry;
        let host = self.host.clone();
        let title = self.title.clone();

        match self.try_run(body) {
            Ok(report) => report,
            // Nested inside another scenario of the same host: let the
            // enclosing loop see it as a usage error.
            Err(err) if err.is_usage_error() && registry.contains(&host) => abort(err),
            Err(err) => panic!("scenario '{title}' failed: {err}"),
        }
    }

    /// Explore every branch combination
    ///
    /// # Errors
    /// Returns usage errors raised anywhere in the body, a registration
    /// conflict for the host, and internal errors (ledger corruption,
    /// replay limit, stalled exploration).
    ///
    /// # Panics
    /// Panics raised by the body itself propagate; see [`FailurePolicy`].
    pub fn try_run<F>(self, mut body: F) -> ScenarioResult<ScenarioReport>
    where
        F: FnMut(&Replay),
    {
        self.config.validate()?;

        let handle: ScenarioHandle = Arc::new(Mutex::new(ScenarioState::new(
            self.title.clone(),
            self.config.clone(),
        )));
        let _registration = self.registry.enter(self.host.clone(), Arc::clone(&handle))?;

        let span = tracing::info_span!("scenario", title = %self.title);
        let _entered = span.enter();

        let mut report = ScenarioReport::new(self.title.clone());
        let mut first_failure: Option<Box<dyn Any + Send>> = None;

        if let Err(err) = self.explore(&handle, &mut body, &mut report, &mut first_failure) {
            if let Some(pending) = &first_failure {
                tracing::warn!(
                    error = %err,
                    failure = %panic_message(pending.as_ref()),
                    "scenario error supersedes an earlier replay failure"
                );
            }
            return Err(err);
        }

        tracing::info!(
            replays = report.replay_count(),
            failed = report.failed_count(),
            "scenario explored"
        );

        if let Some(payload) = first_failure {
            panic::resume_unwind(payload);
        }
        Ok(report)
    }

    /// Replay until the ledger is exhausted, appending to `report`
    ///
    /// The first body panic kept under [`FailurePolicy::ContinueThenReport`]
    /// is left in `first_failure` for the caller.
    fn explore<F>(
        &self,
        handle: &ScenarioHandle,
        body: &mut F,
        report: &mut ScenarioReport,
        first_failure: &mut Option<Box<dyn Any + Send>>,
    ) -> ScenarioResult<()>
    where
        F: FnMut(&Replay),
    {
        loop {
            if report.replay_count() >= self.config.max_replays {
                return Err(ScenarioError::ReplayLimitExceeded {
                    limit: self.config.max_replays,
                });
            }

            let revision = {
                let mut state = handle.lock();
                state.begin_replay();
                state.ledger.revision()
            };
            let replay = Replay::attach(Arc::clone(handle));

            let outcome = {
                let _replay_span =
                    tracing::debug_span!("replay", id = %replay.id(), ordinal = replay.ordinal()).entered();
                panic::catch_unwind(AssertUnwindSafe(|| body(&replay)))
            };

            let failed = match outcome {
                Ok(()) => false,
                Err(payload) => match payload.downcast::<ScenarioError>() {
                    Ok(err) => return Err(*err),
                    Err(payload) => match self.config.failure_policy {
                        FailurePolicy::Abort => panic::resume_unwind(payload),
                        FailurePolicy::ContinueThenReport => {
                            tracing::warn!(
                                replay = %replay.id(),
                                failure = %panic_message(payload.as_ref()),
                                "replay failed, continuing exploration"
                            );
                            if first_failure.is_none() {
                                *first_failure = Some(payload);
                            }
                            true
                        }
                    },
                },
            };

            let mut state = handle.lock();
            report.replays.push(ReplayRecord {
                ordinal: replay.ordinal(),
                replay_id: replay.id(),
                choices: state.take_choices(),
                failed,
            });

            if self.config.verify_ledger {
                state.ledger.verify()?;
            }
            if state.ledger.is_fully_closed() {
                return Ok(());
            }
            if state.ledger.revision() == revision {
                return Err(ScenarioError::ExplorationStalled {
                    open: state.ledger.open_count(),
                });
            }
        }
    }
}

/// Text of a panic payload, for log fields
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

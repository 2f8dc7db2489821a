//! Scenario registry
//!
//! Associates a running host test with the state of its active scenario, so
//! that blocks declared deep in the call stack can find "their" scenario
//! without it being threaded through every call.
//!
//! The registry is shared between independently running tests; it guards
//! nothing but the lookup table itself.

use crate::error::{ScenarioError, ScenarioResult};
use crate::scenario::ScenarioHandle;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Identity of the host test that owns a scenario
///
/// The default is the calling thread, since the standard test harness runs
/// every test on its own thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostTestId {
    /// Test identified by the thread running it
    Thread(ThreadId),

    /// Explicitly named test
    Named(String),
}

impl HostTestId {
    /// Identity of the calling thread
    #[inline]
    #[must_use]
    pub fn current() -> Self {
        Self::Thread(thread::current().id())
    }

    /// Explicit identity
    #[inline]
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl Display for HostTestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thread(id) => write!(f, "{id:?}"),
            Self::Named(name) => write!(f, "'{name}'"),
        }
    }
}

static GLOBAL: Lazy<ScenarioRegistry> = Lazy::new(ScenarioRegistry::new);

/// Lookup table from host test to active scenario
#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    scenarios: RwLock<HashMap<HostTestId, ScenarioHandle>>,
}

impl ScenarioRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            scenarios: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide registry used by default
    #[inline]
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Register `handle` under `host`
    ///
    /// # Errors
    /// Returns [`ScenarioError::ScenarioAlreadyActive`] if `host` already
    /// owns a scenario.
    pub fn register(&self, host: HostTestId, handle: ScenarioHandle) -> ScenarioResult<()> {
        let mut scenarios = self.scenarios.write();
        if scenarios.contains_key(&host) {
            return Err(ScenarioError::ScenarioAlreadyActive { host });
        }
        scenarios.insert(host, handle);
        Ok(())
    }

    /// Register and return a guard that deregisters when dropped
    ///
    /// # Errors
    /// Same as [`ScenarioRegistry::register`].
    pub fn enter(&self, host: HostTestId, handle: ScenarioHandle) -> ScenarioResult<Registration<'_>> {
        self.register(host.clone(), handle)?;
        Ok(Registration {
            registry: self,
            host,
        })
    }

    /// Find the scenario owned by `host`
    ///
    /// # Errors
    /// Returns [`ScenarioError::NoActiveScenario`] if `host` has none.
    pub fn lookup(&self, host: &HostTestId) -> ScenarioResult<ScenarioHandle> {
        self.scenarios
            .read()
            .get(host)
            .map(Arc::clone)
            .ok_or_else(|| ScenarioError::NoActiveScenario { host: host.clone() })
    }

    /// Remove the scenario owned by `host`, returning it
    pub fn deregister(&self, host: &HostTestId) -> Option<ScenarioHandle> {
        self.scenarios.write().remove(host)
    }

    /// Check if `host` owns a scenario
    #[inline]
    #[must_use]
    pub fn contains(&self, host: &HostTestId) -> bool {
        self.scenarios.read().contains_key(host)
    }

    /// Number of active scenarios
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.read().len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Active registration; deregisters on drop, including during unwinding
#[derive(Debug)]
#[must_use = "the scenario is deregistered as soon as the registration is dropped"]
pub struct Registration<'r> {
    registry: &'r ScenarioRegistry,
    host: HostTestId,
}

impl Registration<'_> {
    /// Host the registration belongs to
    #[inline]
    #[must_use]
    pub fn host(&self) -> &HostTestId {
        &self.host
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.deregister(&self.host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::scenario::ScenarioState;
    use parking_lot::Mutex;

    fn handle(title: &str) -> ScenarioHandle {
        Arc::new(Mutex::new(ScenarioState::new(title, ScenarioConfig::default())))
    }

    #[test]
    fn registry_register_and_lookup() {
        let registry = ScenarioRegistry::new();
        let host = HostTestId::named("checkout");
        registry.register(host.clone(), handle("a")).unwrap();

        let found = registry.lookup(&host).unwrap();
        assert_eq!(found.lock().title(), "a");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_rejects_second_scenario_for_host() {
        let registry = ScenarioRegistry::new();
        let host = HostTestId::named("checkout");
        registry.register(host.clone(), handle("a")).unwrap();

        let result = registry.register(host, handle("b"));
        assert!(matches!(result, Err(ScenarioError::ScenarioAlreadyActive { .. })));
    }

    #[test]
    fn registry_lookup_miss() {
        let registry = ScenarioRegistry::new();
        let result = registry.lookup(&HostTestId::named("nobody"));
        assert!(matches!(result, Err(ScenarioError::NoActiveScenario { .. })));
    }

    #[test]
    fn registry_deregister() {
        let registry = ScenarioRegistry::new();
        let host = HostTestId::named("checkout");
        registry.register(host.clone(), handle("a")).unwrap();

        assert!(registry.deregister(&host).is_some());
        assert!(registry.deregister(&host).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn registration_guard_deregisters_on_drop() {
        let registry = ScenarioRegistry::new();
        let host = HostTestId::named("checkout");
        {
            let guard = registry.enter(host.clone(), handle("a")).unwrap();
            assert_eq!(guard.host(), &host);
            assert!(registry.contains(&host));
        }
        assert!(!registry.contains(&host));
    }

    #[test]
    fn hosts_are_isolated() {
        let registry = ScenarioRegistry::new();
        registry.register(HostTestId::named("a"), handle("a")).unwrap();
        registry.register(HostTestId::named("b"), handle("b")).unwrap();

        registry.deregister(&HostTestId::named("a"));
        let b = registry.lookup(&HostTestId::named("b")).unwrap();
        assert_eq!(b.lock().title(), "b");
    }

    #[test]
    fn current_host_differs_across_threads() {
        let here = HostTestId::current();
        let there = thread::spawn(HostTestId::current).join().unwrap();
        assert_ne!(here, there);
        assert_eq!(here, HostTestId::current());
    }
}

//! Testing utilities for the Ramify workspace
//!
//! Shared recorders, fixture shapes, and proptest strategies.

#![allow(missing_docs)]

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use ramify_core::{Branch, ForkSite, Replay};
use std::collections::HashMap;
use std::fmt::Display;

/// Records `(label, replay)` events in execution order
///
/// Replay identifiers are process-wide, so assertions compare replays by
/// the order in which they were first seen (1-based) instead.
#[derive(Debug, Default)]
pub struct Trace {
    events: Mutex<Vec<(String, String)>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, label: &str, replay: impl Display) {
        self.events.lock().push((label.to_string(), replay.to_string()));
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Events with replays renumbered by first appearance
    pub fn events(&self) -> Vec<(String, usize)> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        self.events
            .lock()
            .iter()
            .map(|(label, replay)| {
                let next = seen.len() + 1;
                let ordinal = *seen.entry(replay.clone()).or_insert(next);
                (label.clone(), ordinal)
            })
            .collect()
    }

    /// Labels only, in execution order
    pub fn labels(&self) -> Vec<String> {
        self.events.lock().iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn assert_matches(&self, expected: &[(&str, usize)]) {
        let expected: Vec<(String, usize)> = expected
            .iter()
            .map(|(label, replay)| ((*label).to_string(), *replay))
            .collect();
        assert_eq!(self.events(), expected);
    }
}

/// Tree of nested forks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Leaf,
    Fork(Vec<Shape>),
}

impl Shape {
    /// Name of the `index`-th branch of every fork
    pub fn branch_name(index: usize) -> String {
        format!("b{index}")
    }

    /// Branch names along every root-to-leaf path, depth first
    pub fn leaf_paths(&self) -> Vec<Vec<String>> {
        match self {
            Self::Leaf => vec![Vec::new()],
            Self::Fork(children) if children.is_empty() => vec![Vec::new()],
            Self::Fork(children) => children
                .iter()
                .enumerate()
                .flat_map(|(index, child)| {
                    child.leaf_paths().into_iter().map(move |mut path| {
                        path.insert(0, Self::branch_name(index));
                        path
                    })
                })
                .collect(),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf => 1,
            Self::Fork(children) if children.is_empty() => 1,
            Self::Fork(children) => children.iter().map(Self::leaf_count).sum(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf => 0,
            Self::Fork(children) => 1 + children.iter().map(Self::depth).max().unwrap_or(0),
        }
    }

    /// Declare this shape's forks on `replay`, all under one labeled site
    pub fn explore(&self, replay: &Replay, label: &str) {
        let Self::Fork(children) = self else {
            return;
        };
        replay.fork_at(
            ForkSite::labeled(label),
            children.iter().enumerate().map(move |(index, child)| {
                Branch::new(Self::branch_name(index), move |replay| child.explore(replay, label))
            }),
        );
    }
}

/// Random fork trees, up to four levels deep
pub fn arb_shape() -> impl Strategy<Value = Shape> {
    Just(Shape::Leaf).prop_recursive(4, 32, 4, |inner| {
        proptest::collection::vec(inner, 1..4).prop_map(Shape::Fork)
    })
}

//! Property Tests
//!
//! Random fork trees must be explored exactly once per leaf, in depth-first
//! order, and the ledger must agree with a flat map model under any
//! sequence of edits.

use proptest::prelude::*;
use ramify_core::{branch_id, BranchPath, ForkSite, HostTestId, Ledger, Scenario, ScenarioRegistry};
use ramify_test_utils::{arb_shape, Shape};
use std::collections::{BTreeMap, HashSet};

fn explore(shape: &Shape) -> Vec<Vec<String>> {
    let registry = ScenarioRegistry::new();
    Scenario::new("random tree")
        .with_host(HostTestId::named("random tree"))
        .with_registry(&registry)
        .run(|replay| shape.explore(replay, "tree"))
        .branch_names()
}

#[derive(Debug, Clone)]
enum Edit {
    Mark(Vec<u8>, bool),
    Unmark(Vec<u8>),
    InsertOpen(Vec<u8>),
}

fn arb_segments() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..3, 1..4)
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (arb_segments(), any::<bool>()).prop_map(|(s, closed)| Edit::Mark(s, closed)),
        arb_segments().prop_map(Edit::Unmark),
        arb_segments().prop_map(Edit::InsertOpen),
    ]
}

fn to_path(segments: &[u8]) -> BranchPath {
    let site = ForkSite::labeled("model");
    segments
        .iter()
        .map(|s| branch_id(&site, &format!("n{s}")))
        .collect::<Vec<_>>()
        .into()
}

proptest! {
    #[test]
    fn prop_one_replay_per_leaf(shape in arb_shape()) {
        let explored = explore(&shape);
        prop_assert_eq!(explored.len(), shape.leaf_count());

        let unique: HashSet<&Vec<String>> = explored.iter().collect();
        prop_assert_eq!(unique.len(), explored.len());
    }

    #[test]
    fn prop_exploration_is_depth_first(shape in arb_shape()) {
        prop_assert_eq!(explore(&shape), shape.leaf_paths());
    }

    #[test]
    fn prop_ledger_matches_model(edits in proptest::collection::vec(arb_edit(), 0..40)) {
        let mut ledger = Ledger::new();
        let mut model: BTreeMap<BranchPath, bool> = BTreeMap::new();

        for edit in edits {
            match edit {
                Edit::Mark(segments, closed) => {
                    let path = to_path(&segments);
                    ledger.mark(&path, closed).unwrap();
                    model.insert(path, closed);
                }
                Edit::Unmark(segments) => {
                    let path = to_path(&segments);
                    prop_assert_eq!(ledger.unmark(&path), model.remove(&path).is_some());
                }
                Edit::InsertOpen(segments) => {
                    let path = to_path(&segments);
                    let inserted = ledger.insert_open(&path).unwrap();
                    prop_assert_eq!(inserted, !model.contains_key(&path));
                    model.entry(path).or_insert(false);
                }
            }

            prop_assert!(ledger.verify().is_ok());
            prop_assert_eq!(ledger.len(), model.len());
            prop_assert_eq!(ledger.open_count(), model.values().filter(|closed| !**closed).count());
            prop_assert_eq!(ledger.is_fully_closed(), model.values().all(|closed| *closed));
        }

        for (path, closed) in &model {
            prop_assert_eq!(ledger.get(path), Some(*closed));

            let below: Vec<bool> = model
                .iter()
                .filter(|(other, _)| path.is_prefix_of(other))
                .map(|(_, c)| *c)
                .collect();
            let summary = ledger.summary(path);
            prop_assert_eq!(summary.entries, below.len());
            prop_assert_eq!(summary.open, below.iter().filter(|c| !**c).count());
        }

        let mut expected: Vec<(BranchPath, bool)> = model.into_iter().collect();
        let mut actual = ledger.entries();
        expected.sort();
        actual.sort();
        prop_assert_eq!(actual, expected);
    }
}

//! Exploration ledger
//!
//! Provides [`Ledger`], the per-scenario memory of which branch paths have
//! been explored. Entries map a [`BranchPath`] to a `closed` flag.
//!
//! The ledger is a trie keyed by path segment. Every node caches the number
//! of entries and of open entries in its subtree, so the question the
//! selector asks on every branch ("is anything under this path still
//! open?") is answered in O(depth) instead of by scanning every key.

use crate::error::{ScenarioError, ScenarioResult};
use crate::identity::BranchId;
use crate::path::BranchPath;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct Node {
    /// `Some(closed)` if this exact path is an entry
    entry: Option<bool>,
    /// Entries in this subtree, self included
    entries: usize,
    /// Open entries in this subtree, self included
    open: usize,
    children: BTreeMap<BranchId, Node>,
}

impl Node {
    fn apply(&mut self, d_entries: isize, d_open: isize) {
        self.entries = self.entries.saturating_add_signed(d_entries);
        self.open = self.open.saturating_add_signed(d_open);
    }

    fn collect(&self, path: &mut Vec<BranchId>, out: &mut Vec<(BranchPath, bool)>) {
        if let Some(closed) = self.entry {
            out.push((BranchPath::new(path.clone()), closed));
        }
        for (id, child) in &self.children {
            path.push(*id);
            child.collect(path, out);
            path.pop();
        }
    }

    /// Recompute counters from scratch, comparing against the cached ones
    fn verify(&self, path: &mut Vec<BranchId>) -> ScenarioResult<(usize, usize)> {
        let mut entries = usize::from(self.entry.is_some());
        let mut open = usize::from(self.entry == Some(false));

        for (id, child) in &self.children {
            path.push(*id);
            let (child_entries, child_open) = child.verify(path)?;
            if child_entries == 0 {
                return Err(ScenarioError::corrupted(format!(
                    "dangling node at {}",
                    BranchPath::new(path.clone())
                )));
            }
            path.pop();
            entries += child_entries;
            open += child_open;
        }

        if entries != self.entries || open != self.open {
            return Err(ScenarioError::corrupted(format!(
                "counter mismatch at '{}': cached {}/{} open, actual {}/{} open",
                BranchPath::new(path.clone()),
                self.open,
                self.entries,
                open,
                entries,
            )));
        }
        Ok((entries, open))
    }
}

/// Aggregate view of the entries under a prefix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Entries at or below the prefix
    pub entries: usize,
    /// Of those, how many are still open
    pub open: usize,
}

impl Summary {
    /// Nothing recorded under the prefix
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Something recorded, nothing open
    #[inline]
    #[must_use]
    pub const fn is_fully_closed(&self) -> bool {
        self.entries > 0 && self.open == 0
    }

    /// At least one entry still open
    #[inline]
    #[must_use]
    pub const fn has_open(&self) -> bool {
        self.open > 0
    }
}

/// Per-scenario record of explored paths
///
/// Holds the exploration frontier: a path is only dropped once a longer
/// path below it has been recorded (see [`Ledger::supersede`]).
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    root: Node,
    revision: u64,
}

impl Ledger {
    /// Create empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, path: &BranchPath) -> Option<&Node> {
        path.iter()
            .try_fold(&self.root, |node, id| node.children.get(id))
    }

    /// Flag stored for exactly `path`
    #[must_use]
    pub fn get(&self, path: &BranchPath) -> Option<bool> {
        self.node(path).and_then(|node| node.entry)
    }

    /// Check if `path` is an entry
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &BranchPath) -> bool {
        self.get(path).is_some()
    }

    /// Counts of entries at or below `prefix`
    #[must_use]
    pub fn summary(&self, prefix: &BranchPath) -> Summary {
        self.node(prefix)
            .map(|node| Summary {
                entries: node.entries,
                open: node.open,
            })
            .unwrap_or_default()
    }

    /// All entries at or below `prefix`, in path order
    #[must_use]
    pub fn descendants(&self, prefix: &BranchPath) -> Vec<(BranchPath, bool)> {
        let mut out = Vec::new();
        if let Some(node) = self.node(prefix) {
            let mut scratch = prefix.segments().to_vec();
            node.collect(&mut scratch, &mut out);
        }
        out
    }

    /// Every entry, in path order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> Vec<(BranchPath, bool)> {
        self.descendants(&BranchPath::root())
    }

    /// Insert or flip an entry
    ///
    /// # Errors
    /// Returns [`ScenarioError::LedgerCorrupted`] for the root path, which
    /// is never a fork choice.
    pub fn mark(&mut self, path: &BranchPath, closed: bool) -> ScenarioResult<()> {
        if path.is_root() {
            return Err(ScenarioError::corrupted("the root path cannot be marked"));
        }

        let previous = self.get(path);
        if previous == Some(closed) {
            return Ok(());
        }

        let d_entries = isize::from(previous.is_none());
        let d_open = isize::from(!closed) - isize::from(previous == Some(false));

        let mut node = &mut self.root;
        node.apply(d_entries, d_open);
        for id in path.iter() {
            node = node.children.entry(*id).or_default();
            node.apply(d_entries, d_open);
        }
        node.entry = Some(closed);

        self.revision += 1;
        Ok(())
    }

    /// Remove an entry; returns whether one was present
    ///
    /// Nodes left without entries beneath them are pruned.
    pub fn unmark(&mut self, path: &BranchPath) -> bool {
        let Some(previous) = self.get(path) else {
            return false;
        };
        let d_open = if previous { 0 } else { -1 };
        Self::remove_in(&mut self.root, path.segments(), d_open);
        self.revision += 1;
        true
    }

    fn remove_in(node: &mut Node, segments: &[BranchId], d_open: isize) {
        node.apply(-1, d_open);
        match segments.split_first() {
            None => node.entry = None,
            Some((head, rest)) => {
                if let Some(child) = node.children.get_mut(head) {
                    Self::remove_in(child, rest, d_open);
                    if child.entries == 0 {
                        node.children.remove(head);
                    }
                }
            }
        }
    }

    /// Record an open placeholder unless `path` is already an entry
    ///
    /// Returns whether a placeholder was inserted.
    ///
    /// # Errors
    /// Same as [`Ledger::mark`].
    pub fn insert_open(&mut self, path: &BranchPath) -> ScenarioResult<bool> {
        if self.contains(path) {
            return Ok(false);
        }
        self.mark(path, false)?;
        Ok(true)
    }

    /// Close `child` and drop the entry for its ancestor `stale`
    ///
    /// The replacement is written before the stale entry is removed.
    ///
    /// # Errors
    /// Returns [`ScenarioError::LedgerCorrupted`] if `stale` is not a strict
    /// ancestor of `child`.
    pub fn supersede(&mut self, stale: &BranchPath, child: &BranchPath) -> ScenarioResult<()> {
        if !stale.is_ancestor_of(child) {
            return Err(ScenarioError::corrupted(format!(
                "'{child}' does not descend from '{stale}'"
            )));
        }
        self.mark(child, true)?;
        self.unmark(stale);
        Ok(())
    }

    /// No open entries remain
    #[inline]
    #[must_use]
    pub fn is_fully_closed(&self) -> bool {
        self.root.open == 0
    }

    /// Total number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.entries
    }

    /// Check if ledger is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.entries == 0
    }

    /// Number of open entries
    #[inline]
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.root.open
    }

    /// Monotonic counter bumped by every effective mutation
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Check the cached counters against the stored entries
    ///
    /// # Errors
    /// Returns [`ScenarioError::LedgerCorrupted`] describing the first
    /// inconsistency found.
    pub fn verify(&self) -> ScenarioResult<()> {
        if self.root.entry.is_some() {
            return Err(ScenarioError::corrupted("root path holds an entry"));
        }
        self.root.verify(&mut Vec::new()).map(|_| ())
    }
}

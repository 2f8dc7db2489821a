//! Branch selection
//!
//! Provides [`BranchSelector`], which decides which branch of a fork a
//! replay enters and records what is left for later replays.
//!
//! # Selection Logic
//!
//! For the current path `P` and an offered branch `id`, with
//! `candidate = P/id`:
//! - nothing recorded under `candidate` → enter it (first visit)
//! - something recorded, all closed → skip it (fully explored earlier)
//! - something recorded, some open → enter it again (a nested fork below
//!   still has unexplored branches)
//!
//! Entering closes `candidate` and drops the entry for `P`, which the longer
//! path now supersedes. Branches are offered in declaration order; once one
//! is entered, every later sibling is recorded as an open placeholder.

use crate::error::ScenarioResult;
use crate::identity::BranchId;
use crate::ledger::Ledger;
use crate::path::BranchPath;

/// Outcome of offering one branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Run the branch body on this replay
    Enter,

    /// Subtree already fully explored
    Skip,
}

/// Selector bound to one scenario's cursor and ledger
#[derive(Debug)]
pub struct BranchSelector<'a> {
    cursor: &'a mut BranchPath,
    ledger: &'a mut Ledger,
}

impl<'a> BranchSelector<'a> {
    /// Create selector
    #[inline]
    #[must_use]
    pub fn new(cursor: &'a mut BranchPath, ledger: &'a mut Ledger) -> Self {
        Self { cursor, ledger }
    }

    /// Offer a single branch below the current cursor
    ///
    /// On [`Visit::Enter`] the cursor has moved to the branch.
    ///
    /// # Errors
    /// Propagates ledger corruption.
    pub fn visit(&mut self, id: BranchId) -> ScenarioResult<Visit> {
        let candidate = self.cursor.extend(id);
        if self.ledger.summary(&candidate).is_fully_closed() {
            return Ok(Visit::Skip);
        }

        self.ledger.supersede(self.cursor, &candidate)?;
        *self.cursor = candidate;
        Ok(Visit::Enter)
    }

    /// Choose one branch of a fork
    ///
    /// Returns the index of the entered branch, or `None` if every branch
    /// is already explored (or there are none). The cursor is left on the
    /// entered branch; the caller restores it once the body finishes.
    ///
    /// # Errors
    /// Propagates ledger corruption.
    pub fn select(&mut self, candidates: &[BranchId]) -> ScenarioResult<Option<usize>> {
        let parent = self.cursor.clone();
        let mut chosen = None;

        for (index, id) in candidates.iter().enumerate() {
            if chosen.is_some() {
                self.ledger.insert_open(&parent.extend(*id))?;
            } else if self.visit(*id)? == Visit::Enter {
                chosen = Some(index);
            }
        }

        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> BranchId {
        BranchId::new([n; 8])
    }

    fn path(ids: &[u8]) -> BranchPath {
        BranchPath::new(ids.iter().map(|n| id(*n)).collect())
    }

    #[test]
    fn first_visit_enters_and_closes() {
        let mut cursor = BranchPath::root();
        let mut ledger = Ledger::new();

        let visit = BranchSelector::new(&mut cursor, &mut ledger).visit(id(1)).unwrap();

        assert_eq!(visit, Visit::Enter);
        assert_eq!(cursor, path(&[1]));
        assert_eq!(ledger.entries(), vec![(path(&[1]), true)]);
    }

    #[test]
    fn closed_subtree_is_skipped() {
        let mut cursor = BranchPath::root();
        let mut ledger = Ledger::new();
        ledger.mark(&path(&[1]), true).unwrap();
        ledger.mark(&path(&[1, 2]), true).unwrap();

        let visit = BranchSelector::new(&mut cursor, &mut ledger).visit(id(1)).unwrap();

        assert_eq!(visit, Visit::Skip);
        assert!(cursor.is_root());
    }

    #[test]
    fn open_descendant_reenters() {
        let mut cursor = BranchPath::root();
        let mut ledger = Ledger::new();
        ledger.mark(&path(&[1, 2]), true).unwrap();
        ledger.mark(&path(&[1, 3]), false).unwrap();

        let visit = BranchSelector::new(&mut cursor, &mut ledger).visit(id(1)).unwrap();

        assert_eq!(visit, Visit::Enter);
        assert_eq!(ledger.get(&path(&[1])), Some(true));
    }

    #[test]
    fn entering_drops_parent_entry() {
        let mut cursor = path(&[1]);
        let mut ledger = Ledger::new();
        ledger.mark(&path(&[1]), true).unwrap();

        BranchSelector::new(&mut cursor, &mut ledger).visit(id(2)).unwrap();

        assert_eq!(ledger.entries(), vec![(path(&[1, 2]), true)]);
        assert_eq!(cursor, path(&[1, 2]));
    }

    #[test]
    fn select_registers_later_siblings_as_open() {
        let mut cursor = BranchPath::root();
        let mut ledger = Ledger::new();

        let chosen = BranchSelector::new(&mut cursor, &mut ledger)
            .select(&[id(1), id(2), id(3)])
            .unwrap();

        assert_eq!(chosen, Some(0));
        assert_eq!(
            ledger.entries(),
            vec![(path(&[1]), true), (path(&[2]), false), (path(&[3]), false)]
        );
    }

    #[test]
    fn select_skips_to_first_unexplored() {
        let mut cursor = BranchPath::root();
        let mut ledger = Ledger::new();
        ledger.mark(&path(&[1]), true).unwrap();
        ledger.mark(&path(&[2]), false).unwrap();
        ledger.mark(&path(&[3]), false).unwrap();

        let chosen = BranchSelector::new(&mut cursor, &mut ledger)
            .select(&[id(1), id(2), id(3)])
            .unwrap();

        assert_eq!(chosen, Some(1));
        assert_eq!(ledger.get(&path(&[2])), Some(true));
        assert_eq!(ledger.get(&path(&[3])), Some(false));
    }

    #[test]
    fn select_keeps_closed_later_sibling_closed() {
        let mut cursor = BranchPath::root();
        let mut ledger = Ledger::new();
        ledger.mark(&path(&[2]), true).unwrap();

        BranchSelector::new(&mut cursor, &mut ledger)
            .select(&[id(1), id(2)])
            .unwrap();

        assert_eq!(ledger.get(&path(&[2])), Some(true));
    }

    #[test]
    fn select_with_everything_closed_changes_nothing() {
        let mut cursor = BranchPath::root();
        let mut ledger = Ledger::new();
        ledger.mark(&path(&[1]), true).unwrap();
        ledger.mark(&path(&[2]), true).unwrap();
        let rev = ledger.revision();

        let chosen = BranchSelector::new(&mut cursor, &mut ledger)
            .select(&[id(1), id(2)])
            .unwrap();

        assert_eq!(chosen, None);
        assert!(cursor.is_root());
        assert_eq!(ledger.revision(), rev);
    }

    #[test]
    fn select_empty_fork_is_noop() {
        let mut cursor = BranchPath::root();
        let mut ledger = Ledger::new();

        let chosen = BranchSelector::new(&mut cursor, &mut ledger).select(&[]).unwrap();

        assert_eq!(chosen, None);
        assert!(ledger.is_empty());
    }
}

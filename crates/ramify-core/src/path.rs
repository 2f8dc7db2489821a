//! Branch paths
//!
//! Provides [`BranchPath`], the sequence of branch identities leading from
//! the scenario root to the current point of a replay.

use crate::identity::{BranchId, IdentityError};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Separator used when a path is rendered as a string
pub const PATH_SEPARATOR: char = '/';

/// Path through the branch tree
///
/// Value type; the root is the empty path. Rendered as `/id/id/...`, with
/// the root rendered as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchPath(Vec<BranchId>);

impl BranchPath {
    /// Create path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<BranchId>) -> Self {
        Self(segments)
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[BranchId] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn extend(&self, id: BranchId) -> Self {
        let mut next = self.clone();
        next.0.push(id);
        next
    }

    /// Parent path (`None` for the root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Self(rest.to_vec())),
            None => None,
        }
    }

    /// Last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<BranchId> {
        self.0.last().copied()
    }

    /// Segment-wise prefix check; a path is a prefix of itself
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Strict prefix check
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &BranchId> {
        self.0.iter()
    }
}

impl Display for BranchPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for id in &self.0 {
            write!(f, "{PATH_SEPARATOR}{id}")?;
        }
        Ok(())
    }
}

impl FromStr for BranchPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let rest = s
            .strip_prefix(PATH_SEPARATOR)
            .ok_or_else(|| PathError::MissingLeadingSeparator(s.to_string()))?;

        let segments = rest
            .split(PATH_SEPARATOR)
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else {
                    seg.parse::<BranchId>().map_err(PathError::from)
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl From<Vec<BranchId>> for BranchPath {
    fn from(segments: Vec<BranchId>) -> Self {
        Self(segments)
    }
}

/// Errors parsing a rendered [`BranchPath`]
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Non-root path not starting with the separator
    #[error("path '{0}' must start with '/'")]
    MissingLeadingSeparator(String),

    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Segment is not a branch id
    #[error("invalid segment: {0}")]
    InvalidSegment(#[from] IdentityError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> BranchId {
        BranchId::new([n; 8])
    }

    #[test]
    fn path_root() {
        let path = BranchPath::root();
        assert!(path.is_root());
        assert_eq!(path.len(), 0);
        assert!(path.parent().is_none());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn path_extend_and_parent() {
        let a = BranchPath::root().extend(id(1));
        let ab = a.extend(id(2));
        assert_eq!(ab.segments(), &[id(1), id(2)]);
        assert_eq!(ab.parent(), Some(a.clone()));
        assert_eq!(a.parent(), Some(BranchPath::root()));
        assert_eq!(ab.last(), Some(id(2)));
    }

    #[test]
    fn path_extend_leaves_original_untouched() {
        let a = BranchPath::root().extend(id(1));
        let _ = a.extend(id(2));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn path_prefix_is_segment_wise() {
        let a = BranchPath::new(vec![id(1)]);
        let ab = BranchPath::new(vec![id(1), id(2)]);
        let b = BranchPath::new(vec![id(2)]);

        assert!(a.is_prefix_of(&ab));
        assert!(a.is_prefix_of(&a));
        assert!(!ab.is_prefix_of(&a));
        assert!(!b.is_prefix_of(&ab));
        assert!(BranchPath::root().is_prefix_of(&ab));
    }

    #[test]
    fn path_is_ancestor_of() {
        let a = BranchPath::new(vec![id(1)]);
        let ab = a.extend(id(2));
        assert!(a.is_ancestor_of(&ab));
        assert!(!a.is_ancestor_of(&a));
    }

    #[test]
    fn path_display() {
        let path = BranchPath::new(vec![id(0xab), id(0x01)]);
        assert_eq!(path.to_string(), "/abababababababab/0101010101010101");
    }

    #[test]
    fn path_from_str_valid() {
        let path: BranchPath = "/abababababababab/0101010101010101".parse().unwrap();
        assert_eq!(path.segments(), &[id(0xab), id(0x01)]);
    }

    #[test]
    fn path_from_str_empty_is_root() {
        let path: BranchPath = "".parse().unwrap();
        assert!(path.is_root());
    }

    #[test]
    fn path_from_str_empty_segment() {
        let result: Result<BranchPath, _> = "/abababababababab//0101010101010101".parse();
        assert!(matches!(result, Err(PathError::EmptySegment)));
    }

    #[test]
    fn path_from_str_requires_leading_separator() {
        let result: Result<BranchPath, _> = "abababababababab".parse();
        assert!(matches!(result, Err(PathError::MissingLeadingSeparator(_))));
    }
}

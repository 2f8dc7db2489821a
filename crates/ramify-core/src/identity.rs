//! Stable branch identities
//!
//! Provides [`BranchId`], a short content hash derived from a fork's
//! declaration site and a branch name. The same site and name always hash
//! to the same identity, so a branch is recognised again on every replay.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::panic::Location;
use std::str::FromStr;

/// Number of hash bytes kept for an identity
pub const BRANCH_ID_LEN: usize = 8;

/// Where a fork is declared
///
/// Either a source coordinate captured with `#[track_caller]`, or a label
/// supplied by the author when the same call site must host several
/// independent forks (helpers called from many places, generated forks).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForkSite {
    /// Source position of the fork call
    Source {
        /// Source file as reported by the compiler
        file: String,
        /// 1-based line
        line: u32,
        /// 1-based column
        column: u32,
    },

    /// Author-supplied label
    Label(String),
}

impl ForkSite {
    /// Capture the caller's source position
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    /// Build from a [`Location`]
    #[inline]
    #[must_use]
    pub fn from_location(location: &Location<'_>) -> Self {
        Self::Source {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }

    /// Explicitly labelled site
    #[inline]
    #[must_use]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    fn feed(&self, hasher: &mut blake3::Hasher) {
        match self {
            Self::Source { file, line, column } => {
                hasher.update(&[0x01]);
                hasher.update(&(file.len() as u64).to_le_bytes());
                hasher.update(file.as_bytes());
                hasher.update(&line.to_le_bytes());
                hasher.update(&column.to_le_bytes());
            }
            Self::Label(label) => {
                hasher.update(&[0x02]);
                hasher.update(&(label.len() as u64).to_le_bytes());
                hasher.update(label.as_bytes());
            }
        }
    }
}

impl Display for ForkSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source { file, line, column } => write!(f, "{file}:{line}:{column}"),
            Self::Label(label) => write!(f, "#{label}"),
        }
    }
}

/// Identity of one branch of one fork
///
/// Truncated Blake3 digest, rendered as 16 lowercase hex characters. The
/// hex alphabet never contains the path separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchId([u8; BRANCH_ID_LEN]);

impl BranchId {
    /// Wrap raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; BRANCH_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the identity of `name` declared at `site`
    #[must_use]
    pub fn derive(site: &ForkSite, name: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        site.feed(&mut hasher);
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; BRANCH_ID_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[..BRANCH_ID_LEN]);
        Self(bytes)
    }

    /// Underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BRANCH_ID_LEN] {
        &self.0
    }
}

/// Shorthand for [`BranchId::derive`]
#[inline]
#[must_use]
pub fn branch_id(site: &ForkSite, name: &str) -> BranchId {
    BranchId::derive(site, name)
}

impl Display for BranchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for BranchId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != BRANCH_ID_LEN {
            return Err(IdentityError::InvalidLength {
                expected: BRANCH_ID_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; BRANCH_ID_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for BranchId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BranchId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing a rendered [`BranchId`]
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Wrong number of bytes
    #[error("invalid branch id length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Not hex
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

//! Commit identifiers and HEAD positions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Object id of a commit, as printed by git (SHA-1 or SHA-256 hex).
///
/// Treated as opaque: only compared, hashed, stored and abbreviated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(String);

impl CommitId {
    const SHA1_LEN: usize = 40;
    const SHA256_LEN: usize = 64;

    /// Parse a full hex object id.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCommitId`] if `hex` is not a full object id.
    pub fn parse(hex: &str) -> Result<Self, Error> {
        let hex = hex.trim();
        let valid_len = hex.len() == Self::SHA1_LEN || hex.len() == Self::SHA256_LEN;
        if valid_len && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(hex.to_ascii_lowercase()))
        } else {
            Err(Error::InvalidCommitId(hex.to_string()))
        }
    }

    /// Full hex form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CommitId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<git2::Oid> for CommitId {
    fn from(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }
}

impl Serialize for CommitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CommitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Where HEAD points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum Head {
    /// On a local branch.
    Branch(String),
    /// Detached at a commit.
    Detached(CommitId),
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(name) => f.write_str(name),
            Self::Detached(commit) => write!(f, "{} (detached)", commit.short()),
        }
    }
}

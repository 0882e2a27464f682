use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// Stable identity of a sub-level, persistent across save/load.
///
/// Stored as a 128-bit value and written as 32 hex digits. Hyphenated UUID
/// text is accepted on parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubLevelId(u128);

impl SubLevelId {
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for SubLevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for SubLevelId {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s.chars().filter(|c| *c != '-').collect();
        if hex.is_empty() || hex.len() > 32 {
            return Err(KernelError::Scene(format!("Invalid sub-level id: {s:?}")));
        }
        u128::from_str_radix(&hex, 16)
            .map(Self)
            .map_err(|e| KernelError::Scene(format!("Invalid sub-level id {s:?}: {e}")))
    }
}

impl TryFrom<String> for SubLevelId {
    type Error = KernelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubLevelId> for String {
    fn from(id: SubLevelId) -> Self {
        id.to_string()
    }
}

/// Name of a main-grid frame (one world / dimension).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(String);

impl LevelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LevelId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

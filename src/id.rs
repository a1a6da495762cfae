//! Identifier types.
//!
//! Provides the `StatId` and `SectionId` newtypes. Both are plain integer
//! identifiers, unique within their collection in a schema, and are the ids
//! that appear inside reference tokens (`<stat:3:value>`, `<section:1:name>`).

use serde::{Deserialize, Serialize};

/// Identifier of a stat within a schema.
///
/// Stat ids are schema-scoped integers. They serialize as plain numbers,
/// matching the persisted document and the token grammar.
///
/// # Examples
///
/// ```rust
/// use sheetforge::StatId;
///
/// let hp = StatId::new(1);
/// assert_eq!(hp.get(), 1);
/// assert_eq!(hp.to_string(), "1");
///
/// let hp2: StatId = 1.into();
/// assert_eq!(hp, hp2);
/// ```
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatId(u32);

impl StatId {
    /// Create a new `StatId` from a raw integer.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw integer value.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for StatId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for StatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a section within a schema.
///
/// Section ids live in their own number space, independent of stat ids.
///
/// # Examples
///
/// ```rust
/// use sheetforge::SectionId;
///
/// let combat = SectionId::new(2);
/// assert_eq!(combat.get(), 2);
/// ```
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(u32);

impl SectionId {
    /// Create a new `SectionId` from a raw integer.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw integer value.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for SectionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

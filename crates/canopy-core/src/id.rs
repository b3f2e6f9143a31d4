//! Strongly-typed identifiers for Canopy entities.
//!
//! Tree identifiers are:
//! - **Strongly typed**: Prevents mixing up different ID types at compile time
//! - **Lexicographically sortable**: ULIDs encode creation time and sort naturally
//! - **Globally unique**: No coordination required for generation
//!
//! Planter identifiers are opaque strings issued by the external identity
//! system; legacy callers supply their own values, so no format beyond
//! non-empty is assumed.
//!
//! # Example
//!
//! ```rust
//! use canopy_core::id::{PlanterId, TreeId};
//!
//! let tree = TreeId::generate();
//! let planter = PlanterId::new("alumni-0042").unwrap();
//!
//! // IDs are different types - this won't compile:
//! // let wrong: TreeId = planter;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

/// A unique identifier for a logged planting record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(Ulid);

impl TreeId {
    /// Generates a new unique tree ID.
    ///
    /// Uses ULID generation which is:
    /// - Lexicographically sortable by creation time
    /// - Globally unique without coordination
    /// - URL-safe and case-insensitive
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Creates a tree ID from a raw ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TreeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s).map(Self).map_err(|e| Error::InvalidId {
            message: format!("'{s}' is not a valid tree ID: {e}"),
        })
    }
}

/// An opaque identifier for a planter (a verified contributor).
///
/// Planter IDs must be non-empty after trimming. They are issued by the
/// external identity system and may also arrive verbatim from legacy
/// callers supplying their own attribution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanterId(String);

impl PlanterId {
    /// Creates a new planter ID after validating it is non-empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the planter ID is empty or whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidId {
                message: "planter ID cannot be empty".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Creates a planter ID without validation.
    ///
    /// Intended for IDs that have already been validated (e.g., read back
    /// from storage).
    #[must_use]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the planter ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PlanterId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

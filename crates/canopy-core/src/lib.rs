//! # canopy-core
//!
//! Core abstractions for the Canopy community planting ledger.
//!
//! This crate provides the foundational types and services used across all
//! Canopy components:
//!
//! - **Identifiers**: Strongly-typed IDs for trees and planters
//! - **Domain Model**: Planting records, resolved identities, achievements
//! - **Store Traits**: Abstract persistence contracts plus an in-memory backend
//! - **Services**: Submission, deletion, and the milestone achievement engine
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `canopy-core` knows nothing about HTTP. The API layer maps its errors and
//! results onto wire responses; all domain policy lives here.
//!
//! ## Example
//!
//! ```rust
//! use canopy_core::prelude::*;
//!
//! let id = TreeId::generate();
//! assert!(PlanterId::new("alumni-0042").is_ok());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod achievements;
pub mod error;
pub mod id;
pub mod model;
pub mod observability;
pub mod store;
pub mod trees;

pub use error::{Error, Result};
pub use id::{PlanterId, TreeId};
pub use model::{Achievement, Identity, NewAchievement, NewTree, Planter, Tree};
pub use store::{AchievementStore, AwardOutcome, MemoryStore, TreeStore};
pub use trees::{SubmitTree, Submission, TreeService};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::achievements::milestone_for;
    pub use crate::error::{Error, Result};
    pub use crate::id::{PlanterId, TreeId};
    pub use crate::model::{Achievement, Identity, NewTree, Planter, Tree};
    pub use crate::store::{AchievementStore, AwardOutcome, MemoryStore, TreeStore};
    pub use crate::trees::{SubmitTree, Submission, TreeService};
}

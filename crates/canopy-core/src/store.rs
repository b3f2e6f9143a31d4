//! Persistence contracts for trees and achievements.
//!
//! This module defines the store traits all backends must implement, plus an
//! in-memory backend for tests and local development. The durable SQLite
//! backend lives in the `canopy-sqlite` crate.
//!
//! ## Uniqueness contract
//!
//! Two concurrent submissions by the same planter can both observe the same
//! pre-threshold count and both try to award the same milestone. The window
//! is closed at the store, not with in-process locks, since the service may
//! run as multiple independent instances: [`AchievementStore::award`] must
//! treat a duplicate `(planter_id, name)` as the normal
//! [`AwardOutcome::AlreadyAwarded`] result, never as an error.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::id::{PlanterId, TreeId};
use crate::model::{Achievement, NewAchievement, NewTree, Tree};

/// Result of an achievement award attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwardOutcome {
    /// The achievement was stored; this planter had not earned it before.
    Awarded(Achievement),
    /// An achievement with this `(planter_id, name)` already exists.
    /// A normal outcome under retries or concurrent duplicate evaluation.
    AlreadyAwarded,
}

/// Store contract for planting records.
#[async_trait]
pub trait TreeStore: Send + Sync + 'static {
    /// Inserts a new record, assigning its id and creation timestamp.
    async fn insert(&self, tree: NewTree) -> Result<Tree>;

    /// Fetches a record by id. Returns `None` if it doesn't exist.
    async fn get(&self, id: &TreeId) -> Result<Option<Tree>>;

    /// Deletes a record by id.
    ///
    /// Succeeds even if the record doesn't exist (idempotent); callers
    /// wanting not-found semantics fetch first.
    async fn delete(&self, id: &TreeId) -> Result<()>;

    /// Lists all records, newest planting date first.
    async fn list(&self) -> Result<Vec<Tree>>;

    /// Counts the records attributed to the given planter.
    async fn count_by_planter(&self, planter_id: &PlanterId) -> Result<u64>;
}

/// Store contract for unlocked achievements.
#[async_trait]
pub trait AchievementStore: Send + Sync + 'static {
    /// Stores a newly unlocked achievement.
    ///
    /// Returns [`AwardOutcome::AlreadyAwarded`] when this planter already
    /// holds an achievement with the same name. Never returns an error for
    /// that case - it is a normal result.
    async fn award(&self, achievement: NewAchievement) -> Result<AwardOutcome>;

    /// Lists the achievements unlocked by the given planter.
    async fn list_for_planter(&self, planter_id: &PlanterId) -> Result<Vec<Achievement>>;
}

/// In-memory store for testing and local development.
///
/// Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    trees: Arc<RwLock<HashMap<TreeId, Tree>>>,
    achievements: Arc<RwLock<HashMap<(PlanterId, String), Achievement>>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn trees_read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<TreeId, Tree>>> {
        self.trees
            .read()
            .map_err(|_| Error::storage("tree store lock poisoned"))
    }

    fn trees_write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<TreeId, Tree>>> {
        self.trees
            .write()
            .map_err(|_| Error::storage("tree store lock poisoned"))
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn insert(&self, tree: NewTree) -> Result<Tree> {
        let record = Tree {
            id: TreeId::generate(),
            date: tree.date,
            created_at: Utc::now(),
            location: tree.location,
            gps_coordinates: tree.gps_coordinates,
            lat: tree.lat,
            lng: tree.lng,
            type_of_activity: tree.type_of_activity,
            species: tree.species,
            remarks: tree.remarks,
            state: tree.state,
            planted_by: tree.planted_by,
            planted_by_id: tree.planted_by_id,
            graduation_year: tree.graduation_year,
            photo: tree.photo,
        };
        self.trees_write()?.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: &TreeId) -> Result<Option<Tree>> {
        Ok(self.trees_read()?.get(id).cloned())
    }

    async fn delete(&self, id: &TreeId) -> Result<()> {
        self.trees_write()?.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tree>> {
        let mut trees: Vec<Tree> = self.trees_read()?.values().cloned().collect();
        trees.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(trees)
    }

    async fn count_by_planter(&self, planter_id: &PlanterId) -> Result<u64> {
        let count = self
            .trees_read()?
            .values()
            .filter(|t| t.planted_by_id.as_ref() == Some(planter_id))
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl AchievementStore for MemoryStore {
    async fn award(&self, achievement: NewAchievement) -> Result<AwardOutcome> {
        let mut achievements = self
            .achievements
            .write()
            .map_err(|_| Error::storage("achievement store lock poisoned"))?;

        let key = (achievement.planter_id.clone(), achievement.name.clone());
        if achievements.contains_key(&key) {
            return Ok(AwardOutcome::AlreadyAwarded);
        }

        let stored = Achievement {
            planter_id: achievement.planter_id,
            name: achievement.name,
            description: achievement.description,
            icon: achievement.icon,
        };
        achievements.insert(key, stored.clone());
        Ok(AwardOutcome::Awarded(stored))
    }

    async fn list_for_planter(&self, planter_id: &PlanterId) -> Result<Vec<Achievement>> {
        let achievements = self
            .achievements
            .read()
            .map_err(|_| Error::storage("achievement store lock poisoned"))?;

        let mut earned: Vec<Achievement> = achievements
            .values()
            .filter(|a| &a.planter_id == planter_id)
            .cloned()
            .collect();
        earned.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(earned)
    }
}

//! Milestone achievement engine.
//!
//! Awarding is a pure function of "how many trees has this planter logged"
//! plus the side effect of persisting the unlocked milestone exactly once.
//! Thresholds are exact-match, never `>=`: because the count is re-derived
//! from the store on every call, re-evaluation at a non-threshold count is
//! a safe no-op and no count is cached across requests.

use std::sync::Arc;

use crate::id::PlanterId;
use crate::model::{Achievement, NewAchievement};
use crate::store::{AchievementStore, AwardOutcome, TreeStore};

/// A milestone triggered by an exact planting count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    /// Milestone name, unique per planter.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Icon for the milestone tier.
    pub icon: String,
}

/// Returns the milestone unlocked at exactly `count` logged trees, if any.
///
/// The threshold table:
///
/// | count | name         | icon |
/// |-------|--------------|------|
/// | 1     | First Tree   | 🌱   |
/// | 10    | 10 Trees     | 🌿   |
/// | 25    | 25 Trees     | 🌿   |
/// | 50    | 50 Trees     | 🌳   |
/// | 100   | 100 Trees    | 🏆   |
#[must_use]
pub fn milestone_for(count: u64) -> Option<Milestone> {
    match count {
        1 => Some(Milestone {
            name: "First Tree".to_string(),
            description: "Planted your first tree!".to_string(),
            icon: "🌱".to_string(),
        }),
        10 | 25 | 50 | 100 => Some(Milestone {
            name: format!("{count} Trees"),
            description: format!("Planted {count} trees!"),
            icon: icon_for(count).to_string(),
        }),
        _ => None,
    }
}

fn icon_for(count: u64) -> &'static str {
    if count >= 100 {
        "🏆"
    } else if count >= 50 {
        "🌳"
    } else {
        "🌿"
    }
}

/// Evaluates and persists milestone achievements for a planter.
///
/// This is an explicit best-effort side effect: a failed or duplicate award
/// is logged and contributes no entry, and [`evaluate`](Self::evaluate)
/// itself never fails. Since counts only grow and thresholds are
/// exact-match, an award lost to a transient store failure is not retried
/// on later submissions - a known weak point of the count-based trigger,
/// remediable only externally.
pub struct AchievementEngine {
    trees: Arc<dyn TreeStore>,
    achievements: Arc<dyn AchievementStore>,
}

impl AchievementEngine {
    /// Creates an engine over the given stores.
    #[must_use]
    pub fn new(trees: Arc<dyn TreeStore>, achievements: Arc<dyn AchievementStore>) -> Self {
        Self {
            trees,
            achievements,
        }
    }

    /// Evaluates the planter's current tree count (inclusive of any record
    /// just inserted) and awards the matching milestone, if any.
    ///
    /// Returns the achievements newly unlocked by this call; empty when the
    /// count sits between thresholds, the milestone was already held, or an
    /// award could not be persisted.
    pub async fn evaluate(&self, planter_id: &PlanterId) -> Vec<Achievement> {
        let count = match self.trees.count_by_planter(planter_id).await {
            Ok(count) => count,
            Err(error) => {
                tracing::warn!(
                    planter = %planter_id,
                    error = %error,
                    "failed to count trees for achievement evaluation; skipping"
                );
                return Vec::new();
            }
        };

        let Some(milestone) = milestone_for(count) else {
            return Vec::new();
        };

        let award = NewAchievement {
            planter_id: planter_id.clone(),
            name: milestone.name,
            description: milestone.description,
            icon: milestone.icon,
        };

        match self.achievements.award(award).await {
            Ok(AwardOutcome::Awarded(achievement)) => {
                tracing::info!(
                    planter = %planter_id,
                    achievement = %achievement.name,
                    count,
                    "milestone achievement unlocked"
                );
                vec![achievement]
            }
            Ok(AwardOutcome::AlreadyAwarded) => {
                tracing::warn!(
                    planter = %planter_id,
                    count,
                    "milestone already awarded; concurrent duplicate evaluation"
                );
                Vec::new()
            }
            Err(error) => {
                tracing::warn!(
                    planter = %planter_id,
                    count,
                    error = %error,
                    "failed to persist achievement; planting succeeded without it"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::model::{NewTree, Tree};
    use crate::store::MemoryStore;
    use crate::TreeId;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    #[test]
    fn threshold_table_is_exact_match() {
        assert_eq!(milestone_for(0), None);
        assert_eq!(milestone_for(2), None);
        assert_eq!(milestone_for(9), None);
        assert_eq!(milestone_for(11), None);
        assert_eq!(milestone_for(99), None);
        assert_eq!(milestone_for(101), None);

        let first = milestone_for(1).unwrap();
        assert_eq!(first.name, "First Tree");
        assert_eq!(first.icon, "🌱");

        assert_eq!(milestone_for(10).unwrap().icon, "🌿");
        assert_eq!(milestone_for(25).unwrap().icon, "🌿");
        assert_eq!(milestone_for(50).unwrap().icon, "🌳");

        let hundred = milestone_for(100).unwrap();
        assert_eq!(hundred.name, "100 Trees");
        assert_eq!(hundred.description, "Planted 100 trees!");
        assert_eq!(hundred.icon, "🏆");
    }

    fn planted_tree(planter: &PlanterId) -> NewTree {
        NewTree {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            location: "Park".to_string(),
            gps_coordinates: None,
            lat: None,
            lng: None,
            type_of_activity: "Planting".to_string(),
            species: "Oak".to_string(),
            remarks: None,
            state: "Healthy".to_string(),
            planted_by: "Jane".to_string(),
            planted_by_id: Some(planter.clone()),
            graduation_year: None,
            photo: None,
        }
    }

    #[tokio::test]
    async fn first_tree_unlocks_at_count_one() {
        let store = Arc::new(MemoryStore::new());
        let engine = AchievementEngine::new(store.clone(), store.clone());
        let planter = PlanterId::new_unchecked("p1");

        store.insert(planted_tree(&planter)).await.unwrap();
        let unlocked = engine.evaluate(&planter).await;

        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].name, "First Tree");
    }

    #[tokio::test]
    async fn nothing_unlocks_between_thresholds() {
        let store = Arc::new(MemoryStore::new());
        let engine = AchievementEngine::new(store.clone(), store.clone());
        let planter = PlanterId::new_unchecked("p1");

        store.insert(planted_tree(&planter)).await.unwrap();
        store.insert(planted_tree(&planter)).await.unwrap();
        assert!(engine.evaluate(&planter).await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_evaluation_awards_once() {
        let store = Arc::new(MemoryStore::new());
        let engine = AchievementEngine::new(store.clone(), store.clone());
        let planter = PlanterId::new_unchecked("p1");

        store.insert(planted_tree(&planter)).await.unwrap();
        assert_eq!(engine.evaluate(&planter).await.len(), 1);
        // Second evaluation at the same count: the store-level uniqueness
        // check turns it into a no-op rather than a second row.
        assert!(engine.evaluate(&planter).await.is_empty());
        assert_eq!(store.list_for_planter(&planter).await.unwrap().len(), 1);
    }

    struct FailingAchievements;

    #[async_trait]
    impl AchievementStore for FailingAchievements {
        async fn award(&self, _achievement: crate::model::NewAchievement) -> Result<AwardOutcome> {
            Err(Error::storage("achievement table unavailable"))
        }

        async fn list_for_planter(&self, _planter_id: &PlanterId) -> Result<Vec<Achievement>> {
            Ok(Vec::new())
        }
    }

    struct FailingTrees;

    #[async_trait]
    impl TreeStore for FailingTrees {
        async fn insert(&self, _tree: NewTree) -> Result<Tree> {
            Err(Error::storage("down"))
        }
        async fn get(&self, _id: &TreeId) -> Result<Option<Tree>> {
            Err(Error::storage("down"))
        }
        async fn delete(&self, _id: &TreeId) -> Result<()> {
            Err(Error::storage("down"))
        }
        async fn list(&self) -> Result<Vec<Tree>> {
            Err(Error::storage("down"))
        }
        async fn count_by_planter(&self, _planter_id: &PlanterId) -> Result<u64> {
            Err(Error::storage("down"))
        }
    }

    #[tokio::test]
    async fn award_failure_is_swallowed() {
        let trees = Arc::new(MemoryStore::new());
        let planter = PlanterId::new_unchecked("p1");
        trees.insert(planted_tree(&planter)).await.unwrap();

        let engine = AchievementEngine::new(trees, Arc::new(FailingAchievements));
        assert!(engine.evaluate(&planter).await.is_empty());
    }

    #[tokio::test]
    async fn count_failure_is_swallowed() {
        let engine =
            AchievementEngine::new(Arc::new(FailingTrees), Arc::new(MemoryStore::new()));
        let planter = PlanterId::new_unchecked("p1");
        assert!(engine.evaluate(&planter).await.is_empty());
    }
}

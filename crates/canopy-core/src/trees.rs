//! Submission, listing, and deletion of planting records.
//!
//! [`TreeService`] is the orchestration layer over the store traits. It
//! validates submissions, resolves effective attribution from the caller's
//! [`Identity`], writes the record, and invokes the achievement engine. It
//! also enforces ownership on deletes.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::achievements::AchievementEngine;
use crate::error::{Error, Result};
use crate::id::{PlanterId, TreeId};
use crate::model::{Achievement, Identity, NewTree, Tree};
use crate::store::{AchievementStore, TreeStore};

/// A raw planting submission, as received from a caller.
///
/// Required fields are optional here so validation can name everything that
/// is missing in a single error.
#[derive(Debug, Clone, Default)]
pub struct SubmitTree {
    /// Calendar date the planting happened. Required.
    pub date: Option<NaiveDate>,
    /// Where the planting happened. Required.
    pub location: Option<String>,
    /// Optional free-form GPS coordinates.
    pub gps_coordinates: Option<String>,
    /// Optional latitude.
    pub lat: Option<f64>,
    /// Optional longitude.
    pub lng: Option<f64>,
    /// What kind of activity this was. Required.
    pub type_of_activity: Option<String>,
    /// Tree species. Required.
    pub species: Option<String>,
    /// Optional free-text remarks.
    pub remarks: Option<String>,
    /// State or region of the planting. Required.
    pub state: Option<String>,
    /// Display name attribution. Required.
    pub planted_by: Option<String>,
    /// Explicit planter attribution, for legacy anonymous callers. Takes
    /// precedence over the authenticated identity.
    pub planted_by_id: Option<String>,
    /// Explicit graduation cohort year. Takes precedence over the
    /// authenticated identity's cohort.
    pub graduation_year: Option<i32>,
    /// Optional photo reference or URL.
    pub photo: Option<String>,
}

/// The result of a successful submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The stored planting record.
    pub tree: Tree,
    /// Achievements newly unlocked during this call. Empty for anonymous
    /// submissions, since milestones are tracked per planter id.
    pub new_achievements: Vec<Achievement>,
}

/// Orchestrates submissions, listing, and ownership-checked deletion.
pub struct TreeService {
    trees: Arc<dyn TreeStore>,
    engine: AchievementEngine,
}

impl TreeService {
    /// Creates a service over the given stores.
    #[must_use]
    pub fn new(trees: Arc<dyn TreeStore>, achievements: Arc<dyn AchievementStore>) -> Self {
        let engine = AchievementEngine::new(Arc::clone(&trees), achievements);
        Self { trees, engine }
    }

    /// Validates and stores a planting submission, then evaluates
    /// milestone achievements for authenticated callers.
    ///
    /// Attribution: an explicit `planted_by_id` / `graduation_year` in the
    /// payload wins; otherwise both default from the authenticated planter;
    /// anonymous submissions without explicit values carry neither.
    /// Achievement evaluation is best-effort - a failed award never rolls
    /// back the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming every missing required field
    /// (nothing is written in that case), or [`Error::Storage`] when the
    /// insert fails (no achievement evaluation happens then).
    pub async fn submit(&self, submission: SubmitTree, identity: &Identity) -> Result<Submission> {
        let record = normalize(submission, identity)?;
        let tree = self.trees.insert(record).await?;

        tracing::info!(
            tree_id = %tree.id,
            species = %tree.species,
            planted_by = %tree.planted_by,
            authenticated = !identity.is_anonymous(),
            "tree planting recorded"
        );

        // Anonymous submissions never earn achievements: counts are tracked
        // per planter id, not per free-text name.
        let new_achievements = match identity.planter() {
            Some(planter) => self.engine.evaluate(&planter.id).await,
            None => Vec::new(),
        };

        Ok(Submission {
            tree,
            new_achievements,
        })
    }

    /// Lists all planting records, newest planting date first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] when the store read fails.
    pub async fn list(&self) -> Result<Vec<Tree>> {
        self.trees.list().await
    }

    /// Fetches one planting record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TreeNotFound`] when no record has the given id.
    pub async fn get(&self, id: &TreeId) -> Result<Tree> {
        self.trees
            .get(id)
            .await?
            .ok_or_else(|| Error::tree_not_found(id))
    }

    /// Deletes a planting record, enforcing ownership for authenticated
    /// callers.
    ///
    /// Anonymous callers may delete any record, including owned ones. This
    /// is a deliberate backward-compatibility carve-out carried over from
    /// the legacy clients that never authenticated; it is documented as a
    /// security caveat rather than tightened here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TreeNotFound`] when the record doesn't exist,
    /// [`Error::Forbidden`] when an authenticated planter tries to delete a
    /// record owned by someone else, or [`Error::Storage`] when the delete
    /// fails.
    pub async fn delete(&self, id: &TreeId, identity: &Identity) -> Result<()> {
        let tree = self.get(id).await?;

        if let (Some(planter), Some(owner)) = (identity.planter(), tree.planted_by_id.as_ref()) {
            if owner != &planter.id {
                tracing::warn!(
                    tree_id = %id,
                    planter = %planter.id,
                    owner = %owner,
                    "delete refused: caller does not own this tree"
                );
                return Err(Error::forbidden("you can only delete your own trees"));
            }
        }

        self.trees.delete(id).await?;
        tracing::info!(tree_id = %id, "tree record deleted");
        Ok(())
    }
}

/// Validates required fields, trims free text, and resolves attribution.
fn normalize(submission: SubmitTree, identity: &Identity) -> Result<NewTree> {
    let mut missing: Vec<&str> = Vec::new();

    let date = submission.date;
    if date.is_none() {
        missing.push("date");
    }
    let location = required(&submission.location, "location", &mut missing);
    let type_of_activity = required(&submission.type_of_activity, "typeOfActivity", &mut missing);
    let species = required(&submission.species, "species", &mut missing);
    let state = required(&submission.state, "state", &mut missing);
    let planted_by = required(&submission.planted_by, "plantedBy", &mut missing);

    if !missing.is_empty() {
        return Err(Error::missing_fields(&missing));
    }

    let planter = identity.planter();

    // Explicit payload attribution wins over the authenticated identity,
    // so legacy anonymous callers can keep supplying their own.
    let planted_by_id = match optional(submission.planted_by_id) {
        Some(explicit) => Some(PlanterId::new(explicit)?),
        None => planter.map(|p| p.id.clone()),
    };
    let graduation_year = submission
        .graduation_year
        .or_else(|| planter.and_then(|p| p.graduation_year));

    // The defaults are unreachable: absence was recorded in `missing` above.
    Ok(NewTree {
        date: date.unwrap_or_default(),
        location: location.unwrap_or_default(),
        gps_coordinates: optional(submission.gps_coordinates),
        lat: submission.lat,
        lng: submission.lng,
        type_of_activity: type_of_activity.unwrap_or_default(),
        species: species.unwrap_or_default(),
        remarks: optional(submission.remarks),
        state: state.unwrap_or_default(),
        planted_by: planted_by.unwrap_or_default(),
        planted_by_id,
        graduation_year,
        photo: optional(submission.photo),
    })
}

/// Trims a required field, recording it as missing when absent or blank.
fn required(value: &Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Some(trimmed.to_string()),
        _ => {
            missing.push(name);
            None
        }
    }
}

/// Trims an optional field, normalizing blank values to `None`.
fn optional(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Planter;
    use crate::store::MemoryStore;

    fn service(store: &Arc<MemoryStore>) -> TreeService {
        TreeService::new(store.clone(), store.clone())
    }

    fn valid_submission() -> SubmitTree {
        SubmitTree {
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            location: Some("Park".to_string()),
            type_of_activity: Some("Planting".to_string()),
            species: Some("Oak".to_string()),
            state: Some("Healthy".to_string()),
            planted_by: Some("Jane".to_string()),
            ..SubmitTree::default()
        }
    }

    fn jane() -> Identity {
        Identity::Planter(Planter {
            id: PlanterId::new_unchecked("jane-1"),
            name: "Jane".to_string(),
            graduation_year: Some(2019),
        })
    }

    #[tokio::test]
    async fn validation_names_all_missing_fields_and_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let submission = SubmitTree {
            species: Some("Oak".to_string()),
            planted_by: Some("  ".to_string()), // blank counts as missing
            ..SubmitTree::default()
        };
        let err = svc.submit(submission, &Identity::Anonymous).await.unwrap_err();

        let message = err.to_string();
        for field in ["date", "location", "typeOfActivity", "state", "plantedBy"] {
            assert!(message.contains(field), "missing '{field}' in: {message}");
        }
        assert!(!message.contains("species"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn free_text_is_trimmed_and_blank_optionals_dropped() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let submission = SubmitTree {
            location: Some("  Riverside Park  ".to_string()),
            species: Some(" Oak ".to_string()),
            remarks: Some("   ".to_string()),
            photo: Some(String::new()),
            ..valid_submission()
        };
        let result = svc.submit(submission, &Identity::Anonymous).await.unwrap();

        assert_eq!(result.tree.location, "Riverside Park");
        assert_eq!(result.tree.species, "Oak");
        assert_eq!(result.tree.remarks, None);
        assert_eq!(result.tree.photo, None);
    }

    #[tokio::test]
    async fn authenticated_submission_defaults_attribution_from_identity() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let result = svc.submit(valid_submission(), &jane()).await.unwrap();
        assert_eq!(
            result.tree.planted_by_id,
            Some(PlanterId::new_unchecked("jane-1"))
        );
        assert_eq!(result.tree.graduation_year, Some(2019));
    }

    #[tokio::test]
    async fn explicit_payload_attribution_wins_over_identity() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let submission = SubmitTree {
            planted_by_id: Some("legacy-99".to_string()),
            graduation_year: Some(2001),
            ..valid_submission()
        };
        let result = svc.submit(submission, &jane()).await.unwrap();

        assert_eq!(
            result.tree.planted_by_id,
            Some(PlanterId::new_unchecked("legacy-99"))
        );
        assert_eq!(result.tree.graduation_year, Some(2001));
    }

    #[tokio::test]
    async fn anonymous_submission_never_earns_achievements() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        // Even with explicit attribution, anonymous callers get none.
        let submission = SubmitTree {
            planted_by_id: Some("someone".to_string()),
            ..valid_submission()
        };
        let result = svc.submit(submission, &Identity::Anonymous).await.unwrap();
        assert!(result.new_achievements.is_empty());
    }

    #[tokio::test]
    async fn first_authenticated_submission_unlocks_first_tree() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let result = svc.submit(valid_submission(), &jane()).await.unwrap();
        assert_eq!(result.new_achievements.len(), 1);
        assert_eq!(result.new_achievements[0].name, "First Tree");

        // The second submission sits between thresholds.
        let result = svc.submit(valid_submission(), &jane()).await.unwrap();
        assert!(result.new_achievements.is_empty());
    }

    #[tokio::test]
    async fn tenth_submission_unlocks_ten_trees() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        for _ in 0..9 {
            svc.submit(valid_submission(), &jane()).await.unwrap();
        }
        let result = svc.submit(valid_submission(), &jane()).await.unwrap();
        assert_eq!(result.new_achievements.len(), 1);
        assert_eq!(result.new_achievements[0].name, "10 Trees");
        assert_eq!(result.new_achievements[0].icon, "🌿");
    }

    #[tokio::test]
    async fn owner_may_delete_and_stranger_may_not() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let planted = svc.submit(valid_submission(), &jane()).await.unwrap();
        let id = planted.tree.id;

        let stranger = Identity::Planter(Planter {
            id: PlanterId::new_unchecked("mallory-2"),
            name: "Mallory".to_string(),
            graduation_year: None,
        });
        let err = svc.delete(&id, &stranger).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));

        svc.delete(&id, &jane()).await.unwrap();
        assert!(matches!(
            svc.get(&id).await.unwrap_err(),
            Error::TreeNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn anonymous_caller_may_delete_an_owned_record() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        // Backward-compatibility carve-out: no identity, no ownership check.
        let planted = svc.submit(valid_submission(), &jane()).await.unwrap();
        svc.delete(&planted.tree.id, &Identity::Anonymous)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn authenticated_caller_may_delete_unowned_records() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let planted = svc
            .submit(valid_submission(), &Identity::Anonymous)
            .await
            .unwrap();
        assert_eq!(planted.tree.planted_by_id, None);

        svc.delete(&planted.tree.id, &jane()).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_a_missing_record_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let err = svc
            .delete(&TreeId::generate(), &Identity::Anonymous)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TreeNotFound { .. }));
    }
}

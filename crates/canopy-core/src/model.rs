//! Domain model for the planting ledger.
//!
//! A [`Tree`] is one logged planting event. Records are immutable once
//! written: they are created by the submission service and destroyed only by
//! the deletion service, never mutated.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{PlanterId, TreeId};

/// One logged tree-planting event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Store-assigned unique identifier.
    pub id: TreeId,
    /// Calendar date the planting happened.
    pub date: NaiveDate,
    /// Store-assigned creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Where the planting happened (free text, non-empty).
    pub location: String,
    /// Optional free-form GPS coordinates.
    pub gps_coordinates: Option<String>,
    /// Optional latitude.
    pub lat: Option<f64>,
    /// Optional longitude.
    pub lng: Option<f64>,
    /// What kind of activity this was (e.g. "Planting").
    pub type_of_activity: String,
    /// Tree species (non-empty).
    pub species: String,
    /// Optional free-text remarks.
    pub remarks: Option<String>,
    /// State or region of the planting (non-empty).
    pub state: String,
    /// Display name of whoever planted the tree. Always present; the
    /// free-form fallback when no verified identity is attached.
    pub planted_by: String,
    /// Verified planter reference. Present only when an authenticated
    /// planter submitted the record, or a legacy caller supplied explicit
    /// attribution.
    pub planted_by_id: Option<PlanterId>,
    /// Optional graduation cohort year of the planter.
    pub graduation_year: Option<i32>,
    /// Optional photo reference or URL.
    pub photo: Option<String>,
}

impl Tree {
    /// Days elapsed since the planting date, as of `now`. Clamped at zero
    /// for future-dated records.
    #[must_use]
    pub fn age_in_days(&self, now: NaiveDate) -> i64 {
        (now - self.date).num_days().max(0)
    }

    /// Whole years elapsed since the planting date, as of `now`.
    #[must_use]
    pub fn age_in_years(&self, now: NaiveDate) -> i32 {
        let mut years = now.year() - self.date.year();
        if (now.month(), now.day()) < (self.date.month(), self.date.day()) {
            years -= 1;
        }
        years.max(0)
    }
}

/// A planting record ready for insertion; the store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTree {
    /// Calendar date the planting happened.
    pub date: NaiveDate,
    /// Where the planting happened.
    pub location: String,
    /// Optional free-form GPS coordinates.
    pub gps_coordinates: Option<String>,
    /// Optional latitude.
    pub lat: Option<f64>,
    /// Optional longitude.
    pub lng: Option<f64>,
    /// What kind of activity this was.
    pub type_of_activity: String,
    /// Tree species.
    pub species: String,
    /// Optional free-text remarks.
    pub remarks: Option<String>,
    /// State or region of the planting.
    pub state: String,
    /// Display name attribution.
    pub planted_by: String,
    /// Optional verified planter reference.
    pub planted_by_id: Option<PlanterId>,
    /// Optional graduation cohort year.
    pub graduation_year: Option<i32>,
    /// Optional photo reference or URL.
    pub photo: Option<String>,
}

/// A resolved, verified contributor identity.
///
/// Not created by this crate; the API layer resolves it from request
/// credentials and hands it in read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planter {
    /// Identity-system identifier.
    pub id: PlanterId,
    /// Display name.
    pub name: String,
    /// Graduation cohort year, if known.
    pub graduation_year: Option<i32>,
}

/// The outcome of resolving request credentials.
///
/// Absence of a valid credential is not an error; it is the
/// [`Identity::Anonymous`] variant, and every downstream rule (attribution,
/// achievement eligibility, ownership checks) branches on this sum type
/// rather than on error handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A verified planter.
    Planter(Planter),
    /// No verified identity was presented, or the credential was invalid.
    Anonymous,
}

impl Identity {
    /// Returns the planter if this identity is verified.
    #[must_use]
    pub fn planter(&self) -> Option<&Planter> {
        match self {
            Self::Planter(p) => Some(p),
            Self::Anonymous => None,
        }
    }

    /// Returns true when no verified identity is attached.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

/// One unlocked milestone for one planter.
///
/// For a given `(planter_id, name)` pair at most one achievement record
/// ever exists; the store enforces this. Achievements are created exactly
/// once and never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    /// The planter who unlocked the milestone.
    pub planter_id: PlanterId,
    /// Milestone name, e.g. "First Tree" or "25 Trees".
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Icon for the milestone tier.
    pub icon: String,
}

/// An achievement ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAchievement {
    /// The planter who unlocked the milestone.
    pub planter_id: PlanterId,
    /// Milestone name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Icon for the milestone tier.
    pub icon: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_planted_on(date: NaiveDate) -> Tree {
        Tree {
            id: TreeId::generate(),
            date,
            created_at: Utc::now(),
            location: "Park".to_string(),
            gps_coordinates: None,
            lat: None,
            lng: None,
            type_of_activity: "Planting".to_string(),
            species: "Oak".to_string(),
            remarks: None,
            state: "Healthy".to_string(),
            planted_by: "Jane".to_string(),
            planted_by_id: None,
            graduation_year: None,
            photo: None,
        }
    }

    #[test]
    fn age_counts_whole_years_by_anniversary() {
        let tree = tree_planted_on(NaiveDate::from_ymd_opt(2020, 6, 15).unwrap());
        let before = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let on = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(tree.age_in_years(before), 3);
        assert_eq!(tree.age_in_years(on), 4);
    }

    #[test]
    fn future_dated_tree_has_zero_age() {
        let tree = tree_planted_on(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(tree.age_in_days(now), 0);
        assert_eq!(tree.age_in_years(now), 0);
    }

    #[test]
    fn anonymous_identity_has_no_planter() {
        assert!(Identity::Anonymous.planter().is_none());
        assert!(Identity::Anonymous.is_anonymous());
    }
}

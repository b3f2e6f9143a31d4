//! Planting record API routes.
//!
//! ## Routes
//!
//! - `POST   /trees` - Record a planting and evaluate milestone achievements
//! - `GET    /trees` - List all planting records, newest first
//! - `DELETE /trees/{id}` - Delete a planting record (ownership-checked)
//!
//! All three accept anonymous callers. Deletion by an anonymous caller
//! succeeds even for records with a known owner - a backward-compatibility
//! carve-out for legacy clients that predate authentication. Anyone holding
//! a tree id can therefore delete it; see DESIGN.md before changing this.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use canopy_core::model::{Achievement, Tree};
use canopy_core::trees::SubmitTree;
use canopy_core::TreeId;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::server::AppState;

/// A planting submission.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTreeRequest {
    /// Calendar date of the planting (required).
    pub date: Option<NaiveDate>,
    /// Where the planting happened (required).
    pub location: Option<String>,
    /// Optional free-form GPS coordinates.
    pub gps_coordinates: Option<String>,
    /// Optional latitude.
    pub lat: Option<f64>,
    /// Optional longitude.
    pub lng: Option<f64>,
    /// Kind of activity, e.g. "Planting" (required).
    pub type_of_activity: Option<String>,
    /// Tree species (required).
    pub species: Option<String>,
    /// Optional remarks.
    pub remarks: Option<String>,
    /// State or region (required).
    pub state: Option<String>,
    /// Display name of the planter (required).
    pub planted_by: Option<String>,
    /// Explicit planter attribution (legacy callers).
    pub planted_by_id: Option<String>,
    /// Explicit graduation cohort year (legacy callers).
    pub graduation: Option<i32>,
    /// Optional photo reference or URL.
    pub photo: Option<String>,
}

impl From<SubmitTreeRequest> for SubmitTree {
    fn from(req: SubmitTreeRequest) -> Self {
        Self {
            date: req.date,
            location: req.location,
            gps_coordinates: req.gps_coordinates,
            lat: req.lat,
            lng: req.lng,
            type_of_activity: req.type_of_activity,
            species: req.species,
            remarks: req.remarks,
            state: req.state,
            planted_by: req.planted_by,
            planted_by_id: req.planted_by_id,
            graduation_year: req.graduation,
            photo: req.photo,
        }
    }
}

/// Public projection of a newly created record.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeSummary {
    /// Record identifier.
    pub id: String,
    /// Planting date.
    pub date: NaiveDate,
    /// Location.
    pub location: String,
    /// Species.
    pub species: String,
    /// Display name attribution.
    pub planted_by: String,
}

/// A milestone achievement unlocked by a submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct AchievementResponse {
    /// Milestone name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Milestone tier icon.
    pub icon: String,
}

impl From<Achievement> for AchievementResponse {
    fn from(a: Achievement) -> Self {
        Self {
            name: a.name,
            description: a.description,
            icon: a.icon,
        }
    }
}

/// Response to a successful submission.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTreeResponse {
    /// Always true on the success path.
    pub success: bool,
    /// The created record's public projection.
    pub tree: TreeSummary,
    /// Achievements newly unlocked during this call (empty for anonymous
    /// submissions).
    pub new_achievements: Vec<AchievementResponse>,
}

/// Full projection of a planting record, as listed.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeResponse {
    /// Record identifier.
    pub id: String,
    /// Planting date.
    pub date: NaiveDate,
    /// Record creation timestamp.
    pub date_time: chrono::DateTime<Utc>,
    /// Location.
    pub location: String,
    /// Free-form GPS coordinates.
    pub gps_coordinates: Option<String>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
    /// Kind of activity.
    pub type_of_activity: String,
    /// Species.
    pub species: String,
    /// Remarks.
    pub remarks: Option<String>,
    /// State or region.
    pub state: String,
    /// Display name attribution.
    pub planted_by: String,
    /// Verified planter reference, when attributed.
    pub planted_by_id: Option<String>,
    /// Graduation cohort year.
    pub graduation: Option<i32>,
    /// Photo reference or URL.
    pub photo: Option<String>,
    /// Days since the planting date.
    pub age_in_days: i64,
    /// Whole years since the planting date.
    pub age_in_years: i32,
}

impl TreeResponse {
    fn project(tree: Tree, today: NaiveDate) -> Self {
        let age_in_days = tree.age_in_days(today);
        let age_in_years = tree.age_in_years(today);
        Self {
            id: tree.id.to_string(),
            date: tree.date,
            date_time: tree.created_at,
            location: tree.location,
            gps_coordinates: tree.gps_coordinates,
            lat: tree.lat,
            lng: tree.lng,
            type_of_activity: tree.type_of_activity,
            species: tree.species,
            remarks: tree.remarks,
            state: tree.state,
            planted_by: tree.planted_by,
            planted_by_id: tree.planted_by_id.map(|id| id.to_string()),
            graduation: tree.graduation_year,
            photo: tree.photo,
            age_in_days,
            age_in_years,
        }
    }
}

/// List trees response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListTreesResponse {
    /// Always true on the success path.
    pub success: bool,
    /// All records, newest planting date first.
    pub trees: Vec<TreeResponse>,
}

/// Response to a successful deletion.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteTreeResponse {
    /// Always true on the success path.
    pub success: bool,
    /// Confirmation message.
    pub message: String,
}

/// Creates tree routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trees", post(submit_tree).get(list_trees))
        .route("/trees/:id", delete(delete_tree))
}

/// Record a planting.
///
/// POST /trees
#[utoipa::path(
    post,
    path = "/trees",
    tag = "trees",
    request_body = SubmitTreeRequest,
    responses(
        (status = 201, description = "Planting recorded", body = SubmitTreeResponse),
        (status = 400, description = "Missing required fields", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    ),
    security(
        (),
        ("bearerAuth" = [])
    )
)]
pub(crate) async fn submit_tree(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitTreeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        request_id = %ctx.request_id,
        authenticated = !ctx.identity.is_anonymous(),
        "recording tree planting"
    );

    let submission = state
        .tree_service()
        .submit(req.into(), &ctx.identity)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    let response = SubmitTreeResponse {
        success: true,
        tree: TreeSummary {
            id: submission.tree.id.to_string(),
            date: submission.tree.date,
            location: submission.tree.location.clone(),
            species: submission.tree.species.clone(),
            planted_by: submission.tree.planted_by.clone(),
        },
        new_achievements: submission
            .new_achievements
            .into_iter()
            .map(AchievementResponse::from)
            .collect(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// List all planting records.
///
/// GET /trees
#[utoipa::path(
    get,
    path = "/trees",
    tag = "trees",
    responses(
        (status = 200, description = "Records listed", body = ListTreesResponse),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn list_trees(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(request_id = %ctx.request_id, "listing trees");

    let trees = state
        .tree_service()
        .list()
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    let today = Utc::now().date_naive();
    let trees = trees
        .into_iter()
        .map(|tree| TreeResponse::project(tree, today))
        .collect();

    Ok(Json(ListTreesResponse {
        success: true,
        trees,
    }))
}

/// Delete a planting record.
///
/// DELETE /trees/{id}
///
/// Authenticated callers may only delete their own records; anonymous
/// callers may delete any record (legacy carve-out).
#[utoipa::path(
    delete,
    path = "/trees/{id}",
    tag = "trees",
    params(
        ("id" = String, Path, description = "Tree record identifier"),
    ),
    responses(
        (status = 200, description = "Record deleted", body = DeleteTreeResponse),
        (status = 400, description = "Missing id", body = ApiErrorBody),
        (status = 403, description = "Not the record owner", body = ApiErrorBody),
        (status = 404, description = "No such record", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    ),
    security(
        (),
        ("bearerAuth" = [])
    )
)]
pub(crate) async fn delete_tree(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let raw = id.trim();
    if raw.is_empty() {
        return Err(ApiError::bad_request("tree ID is required")
            .with_request_id(ctx.request_id.clone()));
    }

    // An unparseable id cannot name a stored record.
    let Ok(tree_id) = TreeId::from_str(raw) else {
        return Err(ApiError::not_found(format!("tree not found: {raw}"))
            .with_request_id(ctx.request_id.clone()));
    };

    tracing::info!(
        request_id = %ctx.request_id,
        tree_id = %tree_id,
        authenticated = !ctx.identity.is_anonymous(),
        "deleting tree"
    );

    state
        .tree_service()
        .delete(&tree_id, &ctx.identity)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    Ok(Json(DeleteTreeResponse {
        success: true,
        message: "Tree deleted successfully".to_string(),
    }))
}

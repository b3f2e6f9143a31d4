//! `OpenAPI` document generation for `canopy-api`.
//!
//! The generated spec is served at `/openapi.json` and used to generate
//! external clients.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// `OpenAPI` documentation for the Canopy REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Canopy API",
        description = "Community tree-planting ledger with milestone achievements"
    ),
    paths(
        crate::routes::trees::submit_tree,
        crate::routes::trees::list_trees,
        crate::routes::trees::delete_tree,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::trees::SubmitTreeRequest,
            crate::routes::trees::SubmitTreeResponse,
            crate::routes::trees::TreeSummary,
            crate::routes::trees::AchievementResponse,
            crate::routes::trees::TreeResponse,
            crate::routes::trees::ListTreesResponse,
            crate::routes::trees::DeleteTreeResponse,
        )
    ),
    tags(
        (name = "trees", description = "Planting record operations"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

//! HTTP route handlers.

pub mod trees;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// `/trees` routes (identity optional on every one).
pub fn tree_routes() -> Router<Arc<AppState>> {
    trees::routes()
}

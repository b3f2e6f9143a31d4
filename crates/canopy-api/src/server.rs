//! API server implementation.
//!
//! Provides health, ready, and planting-ledger endpoints for Canopy.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use canopy_core::error::{Error, Result};
use canopy_core::store::{AchievementStore, MemoryStore, TreeStore};
use canopy_core::trees::TreeService;
use canopy_core::TreeId;

use crate::config::{Config, CorsConfig};

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Tree store handle (kept for readiness probes).
    trees: Arc<dyn TreeStore>,
    /// The submission/deletion service.
    service: Arc<TreeService>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("trees", &"<TreeStore>")
            .field("service", &"<TreeService>")
            .finish()
    }
}

impl AppState {
    /// Creates new application state over the given stores.
    #[must_use]
    pub fn new(
        config: Config,
        trees: Arc<dyn TreeStore>,
        achievements: Arc<dyn AchievementStore>,
    ) -> Self {
        let service = Arc::new(TreeService::new(Arc::clone(&trees), achievements));
        Self {
            config,
            trees,
            service,
        }
    }

    /// Returns the planting ledger service.
    #[must_use]
    pub fn tree_service(&self) -> &TreeService {
        &self.service
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check
/// that doesn't verify dependencies.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// Returns 200 OK if the service is ready to accept requests. A lookup of
/// a fresh id is sufficient to validate store connectivity without reading
/// any real data.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.trees.get(&TreeId::generate()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(format!("store check failed: {e}")),
            }),
        ),
    }
}

/// Serves the generated `OpenAPI` spec.
async fn serve_openapi() -> impl IntoResponse {
    Json(crate::openapi::openapi())
}

// ============================================================================
// Server
// ============================================================================

/// The Canopy API server.
pub struct Server {
    config: Config,
    trees: Arc<dyn TreeStore>,
    achievements: Arc<dyn AchievementStore>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("trees", &"<TreeStore>")
            .field("achievements", &"<AchievementStore>")
            .finish()
    }
}

impl Server {
    /// Creates a new server with the given configuration.
    ///
    /// Defaults to the in-memory store; use [`Self::with_stores`] for
    /// production.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            config,
            trees: store.clone(),
            achievements: store,
        }
    }

    /// Creates a new server with explicit store backends.
    #[must_use]
    pub fn with_stores(
        config: Config,
        trees: Arc<dyn TreeStore>,
        achievements: Arc<dyn AchievementStore>,
    ) -> Self {
        Self {
            config,
            trees,
            achievements,
        }
    }

    /// Creates a new `ServerBuilder`.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Router {
        let state = Arc::new(AppState::new(
            self.config.clone(),
            Arc::clone(&self.trees),
            Arc::clone(&self.achievements),
        ));

        let cors = self.build_cors_layer();

        Router::new()
            // Health, ready, and spec endpoints
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/openapi.json", get(serve_openapi))
            // Ledger routes (identity resolved per request, never required)
            .merge(crate::routes::tree_routes())
            // Middleware (order matters): trace outermost, then CORS.
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state)
    }

    /// Builds the CORS layer from configuration.
    fn build_cors_layer(&self) -> CorsLayer {
        let cors_config = &self.config.cors;
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static("x-request-id"),
            ])
            .expose_headers([
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-request-id"),
            ])
            .max_age(Duration::from_secs(cors_config.max_age_seconds));

        Self::apply_cors_allowed_origins(cors, cors_config)
    }

    fn apply_cors_allowed_origins(cors: CorsLayer, cors_config: &CorsConfig) -> CorsLayer {
        if cors_config.allowed_origins.is_empty() {
            return cors;
        }

        if cors_config.allowed_origins.iter().any(|origin| origin == "*") {
            if cors_config.allowed_origins.len() > 1 {
                tracing::error!(
                    origins = ?cors_config.allowed_origins,
                    "Invalid CORS config: '*' must be the only allowed origin"
                );
                return cors;
            }
            return cors.allow_origin(Any);
        }

        let mut allowed = Vec::new();
        for origin in &cors_config.allowed_origins {
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed.push(value),
                Err(_) => {
                    tracing::error!(
                        origin = %origin,
                        "Invalid CORS origin; expected a valid HeaderValue"
                    );
                }
            }
        }

        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            tracing::info!(origins = ?cors_config.allowed_origins, "CORS configured");
            cors.allow_origin(AllowOrigin::list(allowed))
        }
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the server
    /// cannot bind to its port.
    pub async fn serve(&self) -> Result<()> {
        self.config.validate()?;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(http_port = self.config.http_port, "Starting Canopy API server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal {
                message: format!("failed to bind to {addr}: {e}"),
            })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    /// Creates a test router for the server.
    ///
    /// Useful for integration tests that drive the full request flow
    /// without binding a socket.
    #[must_use]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }
}

/// Builder for [`Server`].
#[derive(Default)]
pub struct ServerBuilder {
    config: Config,
    trees: Option<Arc<dyn TreeStore>>,
    achievements: Option<Arc<dyn AchievementStore>>,
}

impl ServerBuilder {
    /// Creates a builder with default (debug) configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets debug mode.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Sets the HTTP listen port.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Sets explicit store backends.
    #[must_use]
    pub fn stores(
        mut self,
        trees: Arc<dyn TreeStore>,
        achievements: Arc<dyn AchievementStore>,
    ) -> Self {
        self.trees = Some(trees);
        self.achievements = Some(achievements);
        self
    }

    /// Builds the server, defaulting to a fresh in-memory store.
    #[must_use]
    pub fn build(self) -> Server {
        match (self.trees, self.achievements) {
            (Some(trees), Some(achievements)) => {
                Server::with_stores(self.config, trees, achievements)
            }
            _ => Server::new(self.config),
        }
    }
}

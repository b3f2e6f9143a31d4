//! # canopy-api
//!
//! HTTP composition layer for the Canopy planting ledger.
//!
//! This crate provides the API surface for Canopy, handling:
//!
//! - **Identity**: Optional bearer-token resolution to a verified planter
//! - **Routing**: HTTP endpoint configuration and error mapping
//! - **Service Wiring**: Composition of the core services over a store
//! - **Observability**: Tracing and health checks
//!
//! ## Design Principles
//!
//! This crate is a **thin composition layer** with no domain policy.
//! Validation, attribution, achievement awarding, and ownership checks all
//! live in `canopy-core`.
//!
//! ## Endpoints
//!
//! ```text
//! GET    /health        - Health check
//! GET    /ready         - Readiness check
//! GET    /openapi.json  - OpenAPI document
//! GET    /trees         - List planting records
//! POST   /trees         - Record a planting (optionally authenticated)
//! DELETE /trees/{id}    - Delete a planting (ownership-checked)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use canopy_api::server::Server;
//!
//! let server = Server::builder().debug(true).build();
//! server.serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::context::RequestContext;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::server::Server;
}

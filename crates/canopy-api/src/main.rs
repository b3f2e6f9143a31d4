//! `canopy-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use canopy_api::config::Config;
use canopy_api::server::Server;
use canopy_core::observability::{init_logging, LogFormat};
use canopy_core::store::{AchievementStore, MemoryStore, TreeStore};
use canopy_sqlite::SqliteStore;

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    init_logging(choose_log_format(&config));

    let (trees, achievements): (Arc<dyn TreeStore>, Arc<dyn AchievementStore>) =
        if let Some(path) = config.database_path.as_deref() {
            tracing::info!(path, "Using SQLite store");
            let store = Arc::new(SqliteStore::open(path).await?);
            (store.clone(), store)
        } else {
            // Config::validate already requires a database path outside debug.
            tracing::warn!("CANOPY_DATABASE_PATH not set; using in-memory store (debug only)");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        };

    let server = Server::with_stores(config, trees, achievements);
    server.serve().await?;
    Ok(())
}

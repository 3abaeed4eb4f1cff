//! HTTP intake API.
//!
//! The chat platform adapter pushes membership changes, channel syncs and
//! user commands here. Also serves recorder status, saved recordings and
//! application logs.

pub mod error;
pub mod routes;

use crate::channel::NotificationSink;
use crate::config::{Config, LoggingConfig};
use crate::recorder::{ControllerHandle, RecorderStatusHandle};
use anyhow::{Context, Result};
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub controller: ControllerHandle,
    pub status: RecorderStatusHandle,
    pub notifier: Arc<dyn NotificationSink>,
    pub command_prefix: String,
    pub recordings_dir: PathBuf,
    pub logging: LoggingConfig,
}

impl AppState {
    pub fn new(
        controller: ControllerHandle,
        status: RecorderStatusHandle,
        notifier: Arc<dyn NotificationSink>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            controller,
            status,
            notifier,
            command_prefix: config.commands.prefix.clone(),
            recordings_dir: config.recorder.recordings_dir()?,
            logging: config.logging.clone(),
        })
    }
}

pub struct ApiServer {
    address: String,
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState, config: &Config) -> Self {
        Self {
            address: format!("{}:{}", config.api.host, config.api.port),
            state,
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.address)
            .await
            .with_context(|| format!("Failed to bind API server to {}", self.address))?;

        info!("API server listening on http://{}", self.address);
        info!("Endpoints:");
        info!("  GET  /               - Service info");
        info!("  GET  /version        - Get version info");
        info!("  GET  /status         - Get recorder status");
        info!("  POST /membership     - Report a voice membership change");
        info!("  POST /channels/sync  - Replace all known voice channels");
        info!("  POST /commands       - Run a chat command");
        info!("  GET  /recordings     - List saved recordings");
        info!("  GET  /logs           - Get application logs");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/version", get(version))
        .merge(routes::recorder::router(state.clone()))
        .merge(routes::commands::router(state.clone()))
        .nest("/recordings", routes::recordings::router(state.clone()))
        .nest("/logs", routes::logs::router(state))
        .layer(ServiceBuilder::new())
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "nouncil",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "nouncil"
    }))
}

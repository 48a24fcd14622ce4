//! Sigpanel Web UI
//!
//! Signature settings form served over HTTP.

mod error;
mod handlers;
mod routes;
pub mod session;
mod templates;

use axum::Router;
use rust_embed::RustEmbed;
use sigpanel_common::config::ServerConfig;
use sigpanel_core::SignatureService;
use std::sync::Arc;

pub use error::AppError;
pub use session::{Session, SessionStore, SESSION_COOKIE, SESSION_TTL};
pub use templates::Templates;

/// Static files for the web UI
#[derive(RustEmbed)]
#[folder = "static/"]
pub struct StaticAssets;

/// Application state for the web UI
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub service: Arc<SignatureService>,
    pub sessions: SessionStore,
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Create a new app state
    pub fn new(config: ServerConfig, service: Arc<SignatureService>) -> sigpanel_common::Result<Self> {
        let templates =
            Templates::new().map_err(|e| sigpanel_common::Error::Template(e.to_string()))?;

        Ok(Self {
            config,
            service,
            sessions: SessionStore::new(),
            templates: Arc::new(templates),
        })
    }
}

/// Create the web UI router
pub fn create_router(state: AppState) -> Router {
    routes::create_router(state)
}

/// Run the web UI server until `shutdown` resolves
pub async fn run(
    config: ServerConfig,
    service: Arc<SignatureService>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let state = AppState::new(config.clone(), service)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!("Web UI listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

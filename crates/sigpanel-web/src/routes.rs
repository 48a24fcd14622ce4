//! Web UI Routes

use crate::handlers;
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

/// Create the web UI router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Static assets
        .route("/static/*path", get(handlers::static_file))
        // Page routes
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_page).post(handlers::login_submit))
        .route("/logout", get(handlers::logout))
        .route(
            "/settings/signature",
            get(handlers::signature_page).post(handlers::signature_save),
        )
        .route("/settings/signature/upload", post(handlers::upload_image))
        .route("/settings/signature/upload/:id", get(handlers::uploaded_image))
        // Health check
        .route("/health", get(handlers::health))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

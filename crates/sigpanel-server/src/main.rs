//! Sigpanel - Signature settings server entry point

use anyhow::Result;
use sigpanel_common::config::{Config, LoggingConfig};
use sigpanel_core::{DriverRegistry, SignatureService, Texts};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting Sigpanel...");

    // Initialize driver registry
    let registry = DriverRegistry::with_builtin();
    info!("Signature drivers available: {}", registry.names().join(", "));
    if !registry.contains(&config.signature.driver) {
        warn!(
            "Configured signature driver '{}' is not registered",
            config.signature.driver
        );
    }

    let texts = Texts::new(config.texts.clone());
    let service = Arc::new(SignatureService::new(
        registry,
        config.signature.clone(),
        texts,
    ));

    info!(
        "Using signature driver '{}' on {}",
        config.signature.driver, config.server.bind
    );

    sigpanel_web::run(config.server.clone(), service, shutdown_signal()).await?;

    info!("Sigpanel shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}

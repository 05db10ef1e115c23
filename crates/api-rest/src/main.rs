//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! This binary is useful for development and debugging when you only want the
//! REST server (with OpenAPI/Swagger UI). The workspace's main `cera-run`
//! binary is the deployment entry point.

use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{build_router, AppState};
use cera_core::{
    config::lock_wait_from_env_value, ApplicationService, CoreConfig,
    DEFAULT_APPLICATION_DATA_DIR, DEFAULT_CODIFICATION_PREFIX,
};

/// Main entry point for the CERA REST API server.
///
/// Starts the REST API server on the configured address (default:
/// 0.0.0.0:3000) with OpenAPI/Swagger documentation.
///
/// # Environment Variables
/// - `CERA_REST_ADDR`: server address (default: "0.0.0.0:3000")
/// - `APPLICATION_DATA_DIR`: application data directory (must exist)
/// - `CODIFICATION_PREFIX`: institutional codification prefix
/// - `CERA_LOCK_WAIT_MS`: bounded lock wait in milliseconds
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the application data directory does not exist,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CERA_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting CERA REST API on {}", addr);

    let application_data_dir = std::env::var("APPLICATION_DATA_DIR")
        .unwrap_or_else(|_| DEFAULT_APPLICATION_DATA_DIR.into());
    let application_data_path = Path::new(&application_data_dir);
    if !application_data_path.exists() {
        anyhow::bail!(
            "Application data directory does not exist: {}",
            application_data_path.display()
        );
    }

    let codification_prefix = std::env::var("CODIFICATION_PREFIX")
        .unwrap_or_else(|_| DEFAULT_CODIFICATION_PREFIX.into());
    let lock_wait = lock_wait_from_env_value(std::env::var("CERA_LOCK_WAIT_MS").ok())?;

    let cfg = Arc::new(CoreConfig::new(
        application_data_path.to_path_buf(),
        codification_prefix,
        lock_wait,
    )?);

    let state = AppState {
        service: Arc::new(ApplicationService::new(cfg)),
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

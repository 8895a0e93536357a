//! HTTP server for the dashboard API.
//!
//! GET /api/observaciones/global-compliance - hospital-wide summary.
//! GET /api/observaciones/stats-{sector,professional,moment,shift} - ranked compliance.
//! GET /api/observaciones/stats-techniques - technique usage histogram.
//! GET /api/observaciones/stats-sector-detalle/:sector - role ranking inside one sector.

mod handlers;

pub use handlers::AppState;

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the API router around `state`.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/global-compliance", get(handlers::global_compliance))
        .route("/stats-sector", get(handlers::stats_sector))
        .route("/stats-professional", get(handlers::stats_professional))
        .route("/stats-moment", get(handlers::stats_moment))
        .route("/stats-techniques", get(handlers::stats_techniques))
        .route("/stats-shift", get(handlers::stats_shift))
        .route(
            "/stats-sector-detalle/:sector",
            get(handlers::stats_sector_detail),
        );

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health))
        .nest("/api/observaciones", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// CORS policy for the configured dashboard origins.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_credentials(true))
}

/// Start the HTTP server and run until Ctrl+C or SIGTERM.
pub async fn run_server(state: AppState, config: &ServerConfig) -> Result<()> {
    let store_description = state.store.describe();
    let app = router(state, cors_layer(&config.cors_origins)?);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, store = %store_description, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!(store = %store_description, "Server stopped, record store released");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

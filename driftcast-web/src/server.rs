//! HTTP server wiring for Driftcast.
//!
//! Builds the router over the shared broadcast sink and binds it to the
//! configured port. Every request handler works off [`AppState`]; the only
//! mutable thing it reaches is the sink's subscription side.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::get;
use driftcast_core::config::DriftcastConfig;
use driftcast_core::streaming::BroadcastSink;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::handlers::{live_stream, status};

/// Shared state passed to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<BroadcastSink>,
    pub config: DriftcastConfig,
    pub server_started_at: Instant,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stream", get(live_stream))
        .route("/api/status", get(status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs the HTTP server until the process exits.
///
/// # Errors
///
/// Returns an error if the listen port cannot be bound or the server fails.
pub async fn run_server(
    config: DriftcastConfig,
    sink: Arc<BroadcastSink>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::V4(SocketAddrV4::new(
        Ipv4Addr::UNSPECIFIED,
        config.server.port,
    ));

    let app = router(AppState {
        sink,
        config,
        server_started_at: Instant::now(),
    });

    info!("Stream endpoint listening on http://{addr}/stream");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

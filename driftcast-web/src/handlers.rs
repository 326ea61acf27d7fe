//! Request handlers for the stream and status endpoints.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::server::AppState;

/// Handles `GET /stream`.
///
/// Attaches the caller as a listener and streams every chunk the pump
/// forwards from now on, as a chunked body with the configured content type.
/// A listener that falls behind skips the lost chunks and keeps playing;
/// the body ends only when the service shuts down.
pub async fn live_stream(State(state): State<AppState>) -> Response {
    let rx = state.sink.subscribe();
    info!(
        "Listener attached ({} streaming)",
        state.sink.listener_count()
    );

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(chunk) => return Some((Ok::<Bytes, std::io::Error>(chunk), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Listener lagged, {skipped} chunks dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &state.config.server.content_type)
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Status payload for `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Listeners currently attached to the stream.
    pub listeners: usize,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Directory being streamed.
    pub media_dir: String,
    /// Name suffix that marks eligible files.
    pub filter_suffix: String,
    /// Transfer buffer capacity in bytes.
    pub chunk_size: usize,
}

/// Handles `GET /api/status`.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        listeners: state.sink.listener_count(),
        uptime_secs: state.server_started_at.elapsed().as_secs(),
        media_dir: state.config.storage.media_dir.display().to_string(),
        filter_suffix: state.config.streaming.filter_suffix.clone(),
        chunk_size: state.config.streaming.chunk_size,
    })
}

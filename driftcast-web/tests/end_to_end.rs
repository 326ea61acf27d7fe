//! End-to-end test: filesystem, selector, pump, broadcast fan-out, HTTP body.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use driftcast_core::config::DriftcastConfig;
use driftcast_core::storage::{FsMediaStorage, MediaStorage, MountGuard};
use driftcast_core::streaming::{
    BroadcastSink, ChunkPump, FileSelector, NameFilter, OutputSink, RetryPolicy, TickOutcome,
};
use driftcast_web::AppState;
use driftcast_web::handlers::live_stream;

#[tokio::test]
async fn streams_directory_contents_to_http_listener() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.mp3"), vec![1u8; 700]).unwrap();
    std::fs::write(dir.path().join("note.txt"), b"never streamed").unwrap();

    let mount = MountGuard::new(dir.path());
    mount.initialize().await.unwrap();
    mount.initialize().await.unwrap();

    let storage = FsMediaStorage::new();
    let cursor = storage.open_directory(dir.path()).await.unwrap();
    let selector = FileSelector::new(cursor, NameFilter::new("mp3"), RetryPolicy::default());
    let sink = Arc::new(BroadcastSink::new());
    let mut pump = ChunkPump::new(
        selector,
        Arc::clone(&sink) as Arc<dyn OutputSink>,
        512,
        Duration::ZERO,
    ).unwrap();

    // Nothing listening yet, so no I/O happens
    assert_eq!(pump.tick().await, TickOutcome::Idle);

    let mut config = DriftcastConfig::for_testing();
    config.storage.media_dir = dir.path().to_path_buf();
    let state = AppState {
        sink: Arc::clone(&sink),
        config,
        server_started_at: Instant::now(),
    };
    let response = live_stream(State(state)).await;

    // One chunk per tick: 700 bytes arrive as 512 + 188
    assert_eq!(pump.tick().await, TickOutcome::Forwarded(512));
    assert_eq!(pump.tick().await, TickOutcome::Forwarded(188));

    // Dropping every sender ends the response body
    drop(pump);
    drop(sink);

    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    assert_eq!(body.len(), 700);
    assert!(body.iter().all(|&b| b == 1));
}

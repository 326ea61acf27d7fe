//! Output sink fan-out.
//!
//! The pump sees two operations: "is anything listening" and "take these
//! bytes". `BroadcastSink` implements them over a tokio broadcast channel;
//! every attached listener gets every chunk, and a listener that falls
//! behind loses chunks instead of slowing the pump down.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;

/// Chunks a slow listener may buffer before it starts losing data.
const DEFAULT_FANOUT_CAPACITY: usize = 64;

/// Destination for pumped chunks.
///
/// Fan-out and per-listener failure are the sink's business; the pump never
/// learns whether any individual listener took the bytes.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Whether at least one listener is currently attached.
    fn is_live(&self) -> bool;

    /// Delivers one chunk to every attached listener.
    async fn forward(&self, chunk: Bytes);
}

/// Multi-listener sink over a broadcast channel.
///
/// HTTP handlers call [`subscribe`](BroadcastSink::subscribe) per client and
/// stream the received chunks out as a chunked response body.
#[derive(Debug)]
pub struct BroadcastSink {
    tx: broadcast::Sender<Bytes>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FANOUT_CAPACITY)
    }

    /// Creates a sink whose per-listener backlog holds `capacity` chunks.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Attaches a new listener.
    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.tx.subscribe()
    }

    /// Number of currently attached listeners.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputSink for BroadcastSink {
    fn is_live(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    async fn forward(&self, chunk: Bytes) {
        // Send only fails when no listener is attached, which liveness
        // already guards; a race between the check and the send is harmless
        let _ = self.tx.send(chunk);
    }
}

//! Paced chunk pumping from the selected file to the output sink.
//!
//! One tick moves at most one chunk. The pump owns the transfer buffer,
//! allocated once and never resized, and only ever talks to the sink through
//! its liveness and forward contract.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::streaming::sink::OutputSink;
use crate::streaming::{FileSelector, StreamingError};

/// What a single tick did, for scheduler backoff and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No listener attached; nothing was touched.
    Idle,
    /// No eligible file was available this tick.
    NoFile,
    /// This many bytes were read and forwarded.
    Forwarded(usize),
    /// The current file ended (or failed) and was released.
    Advanced,
}

/// Drains the selected file into the sink, one bounded chunk per tick.
pub struct ChunkPump {
    selector: FileSelector,
    sink: Arc<dyn OutputSink>,
    buffer: Vec<u8>,
    pace_interval: Duration,
}

impl ChunkPump {
    /// Creates a pump with a fixed transfer buffer of `chunk_size` bytes.
    ///
    /// # Errors
    ///
    /// - `StreamingError::InvalidChunkSize` - If `chunk_size` is zero
    pub fn new(
        selector: FileSelector,
        sink: Arc<dyn OutputSink>,
        chunk_size: usize,
        pace_interval: Duration,
    ) -> Result<Self, StreamingError> {
        if chunk_size == 0 {
            return Err(StreamingError::InvalidChunkSize { size: chunk_size });
        }

        Ok(Self {
            selector,
            sink,
            buffer: vec![0u8; chunk_size],
            pace_interval,
        })
    }

    /// Runs one scheduling cycle.
    ///
    /// Checks sink liveness, asks the selector for a readable file, reads up
    /// to one buffer of bytes and forwards exactly that many, then pauses for
    /// the pacing interval. End of file and read failures both release the
    /// current file so the next tick advances; neither is fatal.
    pub async fn tick(&mut self) -> TickOutcome {
        if !self.sink.is_live() {
            trace!("No active listeners");
            return TickOutcome::Idle;
        }

        let Some(file) = self.selector.select_readable_file().await else {
            debug!("No eligible file this tick");
            return TickOutcome::NoFile;
        };
        let name = file.name().to_string();

        match file.read_chunk(&mut self.buffer).await {
            Ok(0) => {
                debug!("End of {name}");
                self.selector.release_current();
                TickOutcome::Advanced
            }
            Err(e) => {
                // Same recovery as end of file: move on to the next file
                warn!("Read failed on {name}: {e}");
                self.selector.release_current();
                TickOutcome::Advanced
            }
            Ok(count) => {
                trace!("Forwarding {count} bytes of {name}");
                self.sink
                    .forward(Bytes::copy_from_slice(&self.buffer[..count]))
                    .await;

                if !self.pace_interval.is_zero() {
                    tokio::time::sleep(self.pace_interval).await;
                }
                TickOutcome::Forwarded(count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::storage::MediaStorage;
    use crate::storage::test_fixtures::InMemoryStorage;
    use crate::streaming::selector::{NameFilter, RetryPolicy};

    /// Sink with switchable liveness that records every forwarded chunk.
    #[derive(Default)]
    struct RecordingSink {
        live: AtomicBool,
        chunks: Mutex<Vec<Bytes>>,
    }

    impl RecordingSink {
        fn live() -> Self {
            Self {
                live: AtomicBool::new(true),
                chunks: Mutex::new(Vec::new()),
            }
        }

        fn chunk_lens(&self) -> Vec<usize> {
            self.chunks.lock().unwrap().iter().map(Bytes::len).collect()
        }

        fn concatenated(&self) -> Vec<u8> {
            self.chunks
                .lock()
                .unwrap()
                .iter()
                .flat_map(|b| b.iter().copied())
                .collect()
        }
    }

    #[async_trait]
    impl OutputSink for RecordingSink {
        fn is_live(&self) -> bool {
            self.live.load(Ordering::SeqCst)
        }

        async fn forward(&self, chunk: Bytes) {
            self.chunks.lock().unwrap().push(chunk);
        }
    }

    async fn pump_over(storage: &InMemoryStorage, sink: Arc<RecordingSink>, chunk_size: usize) -> ChunkPump {
        let cursor = storage.open_directory(Path::new("/")).await.unwrap();
        let selector = FileSelector::new(cursor, NameFilter::new("mp3"), RetryPolicy::default());
        ChunkPump::new(selector, sink, chunk_size, Duration::ZERO).unwrap()
    }

    #[tokio::test]
    async fn test_idle_when_sink_not_live() {
        let mut storage = InMemoryStorage::new();
        storage.add_file("a.mp3", b"data");
        let stats = storage.stats();
        let sink = Arc::new(RecordingSink::default());
        let mut pump = pump_over(&storage, sink.clone(), 512).await;

        assert_eq!(pump.tick().await, TickOutcome::Idle);
        assert_eq!(pump.tick().await, TickOutcome::Idle);

        // No storage I/O of any kind happened
        assert_eq!(stats.entry_pulls(), 0);
        assert_eq!(stats.reads(), 0);
        assert!(sink.chunk_lens().is_empty());
    }

    #[tokio::test]
    async fn test_chunk_sizes_match_file_exactly() {
        let mut storage = InMemoryStorage::new();
        storage.add_file("long.mp3", &vec![1u8; 1000]);
        storage.add_file("short.mp3", &vec![2u8; 10]);
        let sink = Arc::new(RecordingSink::live());
        let mut pump = pump_over(&storage, sink.clone(), 512).await;

        assert_eq!(pump.tick().await, TickOutcome::Forwarded(512));
        assert_eq!(pump.tick().await, TickOutcome::Forwarded(488));
        // File drained, the next tick moves on to the next file
        assert_eq!(pump.tick().await, TickOutcome::Forwarded(10));

        assert_eq!(sink.chunk_lens(), vec![512, 488, 10]);
        let bytes = sink.concatenated();
        assert!(bytes[..1000].iter().all(|&b| b == 1));
        assert!(bytes[1000..].iter().all(|&b| b == 2));
    }

    #[tokio::test]
    async fn test_no_file_tick_is_quiet() {
        let mut storage = InMemoryStorage::new();
        storage.add_file("readme.txt", b"hello");
        let stats = storage.stats();
        let sink = Arc::new(RecordingSink::live());
        let mut pump = pump_over(&storage, sink.clone(), 512).await;

        assert_eq!(pump.tick().await, TickOutcome::NoFile);
        assert_eq!(pump.tick().await, TickOutcome::NoFile);
        assert_eq!(stats.reads(), 0);
        assert!(sink.chunk_lens().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_advances_to_next_file() {
        let mut storage = InMemoryStorage::new();
        storage.add_failing_file("broken.mp3", 64);
        storage.add_file("good.mp3", b"ok");
        let sink = Arc::new(RecordingSink::live());
        let mut pump = pump_over(&storage, sink.clone(), 512).await;

        assert_eq!(pump.tick().await, TickOutcome::Advanced);
        assert_eq!(pump.tick().await, TickOutcome::Forwarded(2));
        assert_eq!(sink.chunk_lens(), vec![2]);
    }

    #[tokio::test]
    async fn test_zero_length_chunks_never_forwarded() {
        let mut storage = InMemoryStorage::new();
        storage.add_file("empty.mp3", b"");
        storage.add_file("full.mp3", b"xyz");
        let sink = Arc::new(RecordingSink::live());
        let mut pump = pump_over(&storage, sink.clone(), 512).await;

        // The empty file is selected, read as zero bytes, and released
        // without the sink ever seeing it
        for _ in 0..4 {
            pump.tick().await;
        }
        assert!(sink.chunk_lens().iter().all(|&len| len > 0));
        assert_eq!(sink.concatenated()[..3], *b"xyz");
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected() {
        let storage = InMemoryStorage::new();
        let cursor = storage.open_directory(Path::new("/")).await.unwrap();
        let selector = FileSelector::new(cursor, NameFilter::new("mp3"), RetryPolicy::default());
        let result = ChunkPump::new(
            selector,
            Arc::new(RecordingSink::live()),
            0,
            Duration::ZERO,
        );
        assert!(matches!(
            result,
            Err(StreamingError::InvalidChunkSize { size: 0 })
        ));
    }
}

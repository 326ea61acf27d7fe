//! File selection and chunk pumping.
//!
//! The selector walks the media directory with two bounded retry counters so
//! a directory with no eligible files can never loop forever. The pump drains
//! the selected file into the output sink one paced chunk per tick. The sink
//! trait is the only seam the pump shares with the network side.

pub mod pump;
pub mod selector;
pub mod sink;

pub use pump::{ChunkPump, TickOutcome};
pub use selector::{FileSelector, NameFilter, RetryPolicy};
pub use sink::{BroadcastSink, OutputSink};

/// Error types for streaming operations.
#[derive(Debug, thiserror::Error)]
pub enum StreamingError {
    /// The transfer buffer cannot be empty.
    #[error("Invalid chunk size: {size}")]
    InvalidChunkSize {
        /// The rejected buffer capacity.
        size: usize,
    },
}

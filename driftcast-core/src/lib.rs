//! Driftcast Core - File selection and chunk pumping
//!
//! This crate provides the building blocks for streaming media files from
//! removable storage to live network listeners: storage access traits, the
//! bounded-retry file selector, the paced chunk pump, and the output sink
//! fan-out contract, plus configuration management.

pub mod config;
pub mod storage;
pub mod streaming;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::DriftcastConfig;
pub use storage::{FsMediaStorage, MountGuard, StorageError};
pub use streaming::{BroadcastSink, ChunkPump, FileSelector, OutputSink, StreamingError};

/// Core errors that can bubble up from any Driftcast subsystem.
#[derive(Debug, thiserror::Error)]
pub enum DriftcastError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Streaming error: {0}")]
    Streaming(#[from] StreamingError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriftcastError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            DriftcastError::Storage(e) => match e {
                StorageError::MountPointMissing { path } => {
                    format!("Storage is not mounted at {path}")
                }
                StorageError::DirectoryUnreadable { path, .. } => {
                    format!("Cannot read media directory {path}")
                }
                _ => "Storage error occurred".to_string(),
            },
            DriftcastError::Streaming(_) => "Streaming error occurred".to_string(),
            DriftcastError::Configuration { reason } => {
                format!("Configuration error: {reason}")
            }
            DriftcastError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DriftcastError::Configuration { .. }
                | DriftcastError::Storage(StorageError::MountPointMissing { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, DriftcastError>;

//! Storage layer for media content on removable devices.
//!
//! Defines the accessor interface the selector and pump consume: directory
//! enumeration with rewind, sequential file reads, and the one-time mount
//! initialization guard. The filesystem implementation lives in `fs`.

pub mod fs;
pub mod mount;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

use std::path::Path;

use async_trait::async_trait;

pub use fs::FsMediaStorage;
pub use mount::MountGuard;

/// Storage access for media directories.
///
/// Implementations expose one directory as a rewindable entry cursor.
/// The selector owns the cursor for the life of the process.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Opens a directory for enumeration.
    ///
    /// # Errors
    ///
    /// - `StorageError::DirectoryUnreadable` - If the directory cannot be listed
    async fn open_directory(&self, path: &Path) -> Result<Box<dyn DirectoryCursor>, StorageError>;
}

/// A cursor over the entries of one directory.
///
/// Enumeration follows the storage backend's native order; no sorting is
/// applied. `rewind` restarts at the first entry.
#[async_trait]
pub trait DirectoryCursor: Send {
    /// Advances to the next entry, or None at the end of the directory.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If listing the directory failed mid-scan
    async fn next_entry(&mut self) -> Result<Option<Box<dyn MediaFile>>, StorageError>;

    /// Restarts enumeration from the first entry.
    ///
    /// # Errors
    ///
    /// - `StorageError::DirectoryUnreadable` - If the directory cannot be reopened
    async fn rewind(&mut self) -> Result<(), StorageError>;
}

/// An open media file handle with sequential read access.
///
/// Dropping the handle closes the underlying file.
#[async_trait]
pub trait MediaFile: Send {
    /// Entry name relative to the streaming root, e.g. `album/track.mp3`.
    fn name(&self) -> &str;

    /// Reads up to `buffer.len()` bytes from the current position.
    ///
    /// Returns 0 at end of file.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If the read failed
    async fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize, StorageError>;

    /// Whether unread bytes remain.
    fn has_remaining(&self) -> bool;
}

/// Error types for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The configured mount point does not exist or is not a directory.
    #[error("Mount point missing or not a directory: {path}")]
    MountPointMissing {
        /// Path that was expected to be mounted.
        path: String,
    },

    /// A directory could not be opened for enumeration.
    #[error("Cannot read directory {path}: {reason}")]
    DirectoryUnreadable {
        /// Path of the unreadable directory.
        path: String,
        /// Underlying failure description.
        reason: String,
    },

    /// A file or directory operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

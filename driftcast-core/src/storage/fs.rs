//! Filesystem-backed media storage.
//!
//! Enumerates a directory tree depth-first in the operating system's native
//! order, yielding file handles with names relative to the streaming root.
//! Rewinding reopens the root listing, which is how the selector wraps back
//! to the first entry after exhausting the directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, ReadDir};
use tokio::io::AsyncReadExt;
use tracing::warn;

use crate::storage::{DirectoryCursor, MediaFile, MediaStorage, StorageError};

/// Media storage over the local filesystem.
#[derive(Debug, Default)]
pub struct FsMediaStorage;

impl FsMediaStorage {
    /// Create new filesystem storage.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaStorage for FsMediaStorage {
    async fn open_directory(&self, path: &Path) -> Result<Box<dyn DirectoryCursor>, StorageError> {
        let listing = tokio::fs::read_dir(path).await.map_err(|e| {
            StorageError::DirectoryUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Box::new(FsDirectoryCursor {
            root: path.to_path_buf(),
            stack: vec![listing],
        }))
    }
}

/// Depth-first cursor over a directory tree.
///
/// The stack holds one open listing per directory level. When the stack
/// drains the cursor keeps reporting "no entry" until it is rewound.
struct FsDirectoryCursor {
    root: PathBuf,
    stack: Vec<ReadDir>,
}

#[async_trait]
impl DirectoryCursor for FsDirectoryCursor {
    async fn next_entry(&mut self) -> Result<Option<Box<dyn MediaFile>>, StorageError> {
        loop {
            let Some(listing) = self.stack.last_mut() else {
                return Ok(None);
            };

            match listing.next_entry().await? {
                None => {
                    // This level is exhausted, resume the parent listing
                    self.stack.pop();
                }
                Some(entry) => {
                    let file_type = entry.file_type().await?;
                    let path = entry.path();

                    if file_type.is_dir() {
                        match tokio::fs::read_dir(&path).await {
                            Ok(listing) => self.stack.push(listing),
                            Err(e) => {
                                warn!("Skipping unreadable directory {}: {}", path.display(), e);
                            }
                        }
                    } else if file_type.is_file() {
                        let name = path
                            .strip_prefix(&self.root)
                            .unwrap_or(&path)
                            .to_string_lossy()
                            .into_owned();
                        return Ok(Some(Box::new(FsMediaFile::open(&path, name).await?)));
                    }
                    // Symlinks and special files are not media entries
                }
            }
        }
    }

    async fn rewind(&mut self) -> Result<(), StorageError> {
        let listing = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            StorageError::DirectoryUnreadable {
                path: self.root.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        self.stack = vec![listing];
        Ok(())
    }
}

/// Open file handle with its remaining byte count.
struct FsMediaFile {
    name: String,
    file: File,
    remaining: u64,
}

impl FsMediaFile {
    async fn open(path: &Path, name: String) -> Result<Self, StorageError> {
        let file = File::open(path).await?;
        let remaining = file.metadata().await?.len();
        Ok(Self {
            name,
            file,
            remaining,
        })
    }
}

#[async_trait]
impl MediaFile for FsMediaFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize, StorageError> {
        let count = self.file.read(buffer).await?;
        self.remaining = self.remaining.saturating_sub(count as u64);
        Ok(count)
    }

    fn has_remaining(&self) -> bool {
        self.remaining > 0
    }
}

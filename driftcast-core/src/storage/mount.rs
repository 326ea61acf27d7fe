//! One-time storage initialization.
//!
//! Removable media is mounted by the host system; before the first tick the
//! service verifies the mount point once and remembers the answer. Repeated
//! calls are no-ops, so callers never need to coordinate who initializes.

use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;
use tracing::info;

use crate::storage::StorageError;

/// Idempotent guard over the storage mount point.
///
/// `initialize` runs its check exactly once per guard; every later call
/// returns the cached result without touching the filesystem.
#[derive(Debug)]
pub struct MountGuard {
    mount_point: PathBuf,
    initialized: OnceCell<()>,
}

impl MountGuard {
    /// Create a guard for the given mount point. No I/O happens here.
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        Self {
            mount_point: mount_point.into(),
            initialized: OnceCell::new(),
        }
    }

    /// Verifies the mount point exists and is a listable directory.
    ///
    /// # Errors
    ///
    /// - `StorageError::MountPointMissing` - If the path is absent or not a directory
    /// - `StorageError::DirectoryUnreadable` - If the directory cannot be listed
    pub async fn initialize(&self) -> Result<(), StorageError> {
        self.initialized
            .get_or_try_init(|| async {
                let metadata = tokio::fs::metadata(&self.mount_point).await.map_err(|_| {
                    StorageError::MountPointMissing {
                        path: self.mount_point.display().to_string(),
                    }
                })?;

                if !metadata.is_dir() {
                    return Err(StorageError::MountPointMissing {
                        path: self.mount_point.display().to_string(),
                    });
                }

                // A listing probe catches permission problems up front
                tokio::fs::read_dir(&self.mount_point).await.map_err(|e| {
                    StorageError::DirectoryUnreadable {
                        path: self.mount_point.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;

                info!("Storage initialized at {}", self.mount_point.display());
                Ok(())
            })
            .await
            .copied()
    }

    /// Path this guard watches.
    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }
}

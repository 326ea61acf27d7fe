//! Test fixtures for storage testing.
//!
//! Provides a scripted in-memory storage backend so selector and pump tests
//! can control enumeration order, inject read failures, and observe exactly
//! how much I/O the core performed.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::storage::{DirectoryCursor, MediaFile, MediaStorage, StorageError};

/// Counters shared between a storage fixture and the tests observing it.
#[derive(Debug, Default)]
pub struct StorageStats {
    /// Calls to `DirectoryCursor::next_entry`.
    pub entry_pulls: AtomicUsize,
    /// Calls to `DirectoryCursor::rewind`.
    pub rewinds: AtomicUsize,
    /// Calls to `MediaFile::read_chunk`.
    pub reads: AtomicUsize,
}

impl StorageStats {
    pub fn entry_pulls(&self) -> usize {
        self.entry_pulls.load(Ordering::SeqCst)
    }

    pub fn rewinds(&self) -> usize {
        self.rewinds.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct ScriptedEntry {
    name: String,
    data: Arc<Vec<u8>>,
    fail_reads: bool,
}

/// In-memory media storage with a fixed, ordered entry list.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: Vec<ScriptedEntry>,
    stats: Arc<StorageStats>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a file entry; enumeration follows insertion order.
    pub fn add_file(&mut self, name: &str, data: &[u8]) {
        self.entries.push(ScriptedEntry {
            name: name.to_string(),
            data: Arc::new(data.to_vec()),
            fail_reads: false,
        });
    }

    /// Appends a file whose every read fails with an I/O error.
    pub fn add_failing_file(&mut self, name: &str, size: usize) {
        self.entries.push(ScriptedEntry {
            name: name.to_string(),
            data: Arc::new(vec![0u8; size]),
            fail_reads: true,
        });
    }

    /// Shared I/O counters for assertions.
    pub fn stats(&self) -> Arc<StorageStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl MediaStorage for InMemoryStorage {
    async fn open_directory(&self, _path: &Path) -> Result<Box<dyn DirectoryCursor>, StorageError> {
        Ok(Box::new(InMemoryCursor {
            entries: self.entries.clone(),
            position: 0,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct InMemoryCursor {
    entries: Vec<ScriptedEntry>,
    position: usize,
    stats: Arc<StorageStats>,
}

#[async_trait]
impl DirectoryCursor for InMemoryCursor {
    async fn next_entry(&mut self) -> Result<Option<Box<dyn MediaFile>>, StorageError> {
        self.stats.entry_pulls.fetch_add(1, Ordering::SeqCst);

        let Some(entry) = self.entries.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;

        Ok(Some(Box::new(InMemoryFile {
            name: entry.name.clone(),
            data: Arc::clone(&entry.data),
            offset: 0,
            fail_reads: entry.fail_reads,
            stats: Arc::clone(&self.stats),
        })))
    }

    async fn rewind(&mut self) -> Result<(), StorageError> {
        self.stats.rewinds.fetch_add(1, Ordering::SeqCst);
        self.position = 0;
        Ok(())
    }
}

struct InMemoryFile {
    name: String,
    data: Arc<Vec<u8>>,
    offset: usize,
    fail_reads: bool,
    stats: Arc<StorageStats>,
}

#[async_trait]
impl MediaFile for InMemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize, StorageError> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);

        if self.fail_reads {
            return Err(StorageError::Io(std::io::Error::other("injected failure")));
        }

        let remaining = &self.data[self.offset..];
        let count = remaining.len().min(buffer.len());
        buffer[..count].copy_from_slice(&remaining[..count]);
        self.offset += count;
        Ok(count)
    }

    fn has_remaining(&self) -> bool {
        self.offset < self.data.len()
    }
}

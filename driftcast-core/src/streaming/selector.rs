//! Bounded-retry file selection.
//!
//! Walks the directory cursor in its native order, wrapping at the end, and
//! hands out the current file until it is drained. Two saturating counters
//! bound every scan: consecutive empty pulls trigger a rewind, and
//! consecutive rewinds without a success end the scan for the tick. Entries
//! that merely fail the name filter count toward neither.

use tracing::{debug, trace, warn};

use crate::config::StreamingConfig;
use crate::storage::{DirectoryCursor, MediaFile};

/// Suffix filter plus hidden-path rejection.
///
/// An entry is eligible when its name ends with the configured suffix and no
/// path segment of the name begins with a dot.
#[derive(Debug, Clone)]
pub struct NameFilter {
    suffix: String,
}

impl NameFilter {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Checks a name relative to the streaming root.
    pub fn matches(&self, name: &str) -> bool {
        name.ends_with(&self.suffix) && !Self::under_hidden_segment(name)
    }

    fn under_hidden_segment(name: &str) -> bool {
        name.split(['/', '\\'])
            .any(|segment| segment.starts_with('.'))
    }
}

/// Retry caps for one directory scan.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Empty pulls tolerated before the cursor is rewound.
    pub empty_entry_threshold: u32,
    /// Rewinds tolerated before the scan gives up for the tick.
    pub restart_limit: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            empty_entry_threshold: 20,
            restart_limit: 10,
        }
    }
}

impl From<&StreamingConfig> for RetryPolicy {
    fn from(config: &StreamingConfig) -> Self {
        Self {
            empty_entry_threshold: config.empty_entry_threshold,
            restart_limit: config.restart_limit,
        }
    }
}

/// Current selection state.
///
/// Explicit so "no file" and "gave up this tick" are never conflated with an
/// open handle.
enum Selection {
    /// No file selected; the next call scans.
    Idle,
    /// An open file with the cursor parked after it.
    Draining(Box<dyn MediaFile>),
    /// Retry caps were exceeded on the last scan.
    Exhausted,
}

/// Selects the file the pump should drain next.
///
/// Owns the directory cursor and the at-most-one open file handle for the
/// life of the process.
pub struct FileSelector {
    cursor: Box<dyn DirectoryCursor>,
    filter: NameFilter,
    policy: RetryPolicy,
    selection: Selection,
    empty_pulls: u32,
    restarts: u32,
}

impl FileSelector {
    pub fn new(cursor: Box<dyn DirectoryCursor>, filter: NameFilter, policy: RetryPolicy) -> Self {
        Self {
            cursor,
            filter,
            policy,
            selection: Selection::Idle,
            empty_pulls: 0,
            restarts: 0,
        }
    }

    /// Returns the file to drain this tick, or None when no eligible file
    /// could be found within the retry caps.
    ///
    /// A file with unread bytes is returned unchanged; otherwise it is
    /// released and the scan resumes where the cursor left off, wrapping at
    /// the end of the directory.
    pub async fn select_readable_file(&mut self) -> Option<&mut dyn MediaFile> {
        match &self.selection {
            Selection::Draining(file) if file.has_remaining() => {
                // Forward progress, so the empty-pull streak is over
                self.empty_pulls = 0;
            }
            _ => self.advance().await,
        }

        match &mut self.selection {
            Selection::Draining(file) => Some(file.as_mut()),
            _ => None,
        }
    }

    /// Drops the current file so the next call advances to a new one.
    ///
    /// Called by the pump on end-of-file or a failed read.
    pub fn release_current(&mut self) {
        self.selection = Selection::Idle;
    }

    /// Whether the last scan gave up after exceeding the retry caps.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.selection, Selection::Exhausted)
    }

    /// Scans for the next eligible entry, honoring both retry caps.
    ///
    /// Counters are reset only by a successful selection, so after an
    /// exhausted scan the very next rewind trips the cap again and the scan
    /// stays cheap until a matching file appears.
    async fn advance(&mut self) {
        let was_exhausted = self.is_exhausted();
        self.selection = Selection::Idle;

        loop {
            match self.cursor.next_entry().await {
                Ok(Some(entry)) => {
                    if self.filter.matches(entry.name()) {
                        debug!("Selected {}", entry.name());
                        self.empty_pulls = 0;
                        self.restarts = 0;
                        self.selection = Selection::Draining(entry);
                        return;
                    }
                    trace!("Skipping {}: not eligible", entry.name());
                }
                Ok(None) => {
                    trace!("End of directory");
                    if self.count_empty_pull(was_exhausted).await {
                        return;
                    }
                }
                Err(e) => {
                    // Transient anomaly, treated like an empty pull
                    debug!("Directory pull failed: {e}");
                    if self.count_empty_pull(was_exhausted).await {
                        return;
                    }
                }
            }
        }
    }

    /// Registers an empty pull; returns true when the scan must give up.
    async fn count_empty_pull(&mut self, was_exhausted: bool) -> bool {
        self.empty_pulls = self.empty_pulls.saturating_add(1);
        if self.empty_pulls <= self.policy.empty_entry_threshold {
            return false;
        }

        if let Err(e) = self.cursor.rewind().await {
            warn!("Directory rewind failed: {e}");
        }
        self.restarts = self.restarts.saturating_add(1);

        if self.restarts > self.policy.restart_limit {
            if !was_exhausted {
                warn!(
                    "No eligible file found after {} restarts, idling",
                    self.restarts - 1
                );
            }
            self.selection = Selection::Exhausted;
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::storage::MediaStorage;
    use crate::storage::test_fixtures::{InMemoryStorage, StorageStats};

    async fn selector_over(
        storage: &InMemoryStorage,
        suffix: &str,
        policy: RetryPolicy,
    ) -> (FileSelector, Arc<StorageStats>) {
        let cursor = storage.open_directory(Path::new("/")).await.unwrap();
        let stats = storage.stats();
        (
            FileSelector::new(cursor, NameFilter::new(suffix), policy),
            stats,
        )
    }

    async fn drain(file: &mut dyn crate::storage::MediaFile) {
        let mut buffer = [0u8; 1024];
        while file.read_chunk(&mut buffer).await.unwrap() > 0 {}
    }

    #[test]
    fn test_name_filter_suffix_and_hidden_segments() {
        let filter = NameFilter::new("mp3");

        assert!(filter.matches("a.mp3"));
        assert!(filter.matches("album/track.mp3"));
        assert!(!filter.matches("note.txt"));
        assert!(!filter.matches(".hidden/x.mp3"));
        assert!(!filter.matches("music/.cache/y.mp3"));
        assert!(!filter.matches(".thumbnail.mp3"));
    }

    #[tokio::test]
    async fn test_selection_order_skips_ineligible_entries() {
        let mut storage = InMemoryStorage::new();
        storage.add_file("a.mp3", b"aaaa");
        storage.add_file("b.mp3", b"bbbb");
        storage.add_file("note.txt", b"notes");
        storage.add_file(".hidden/x.mp3", b"xxxx");
        let (mut selector, stats) = selector_over(&storage, "mp3", RetryPolicy::default()).await;

        let first = selector.select_readable_file().await.unwrap();
        assert_eq!(first.name(), "a.mp3");
        drain(first).await;

        let second = selector.select_readable_file().await.unwrap();
        assert_eq!(second.name(), "b.mp3");
        drain(second).await;

        // Wraps back to the first file, never visiting the skipped entries
        let third = selector.select_readable_file().await.unwrap();
        assert_eq!(third.name(), "a.mp3");

        // note.txt and .hidden/x.mp3 were pulled but never read
        assert_eq!(stats.reads(), 2 * 2);
    }

    #[tokio::test]
    async fn test_draining_file_is_returned_unchanged() {
        let mut storage = InMemoryStorage::new();
        storage.add_file("a.mp3", b"aaaa");
        let (mut selector, stats) = selector_over(&storage, "mp3", RetryPolicy::default()).await;

        let file = selector.select_readable_file().await.unwrap();
        let mut buffer = [0u8; 2];
        file.read_chunk(&mut buffer).await.unwrap();

        // Half-read file comes back without touching the cursor
        let pulls_before = stats.entry_pulls();
        let again = selector.select_readable_file().await.unwrap();
        assert_eq!(again.name(), "a.mp3");
        assert_eq!(stats.entry_pulls(), pulls_before);
    }

    #[tokio::test]
    async fn test_no_eligible_files_yields_none_without_reads() {
        let mut storage = InMemoryStorage::new();
        storage.add_file("readme.txt", b"hello");
        let (mut selector, stats) = selector_over(&storage, "mp3", RetryPolicy::default()).await;

        assert!(selector.select_readable_file().await.is_none());
        assert!(selector.is_exhausted());
        assert_eq!(stats.reads(), 0);

        // Consistently empty on later ticks, and cheap: the counters stay
        // above their caps so one rewind ends each scan
        let pulls_after_first = stats.entry_pulls();
        assert!(selector.select_readable_file().await.is_none());
        assert!(selector.select_readable_file().await.is_none());
        assert_eq!(stats.reads(), 0);
        assert!(stats.entry_pulls() - pulls_after_first <= 4);
    }

    #[tokio::test]
    async fn test_empty_directory_scan_is_bounded() {
        let storage = InMemoryStorage::new();
        let policy = RetryPolicy {
            empty_entry_threshold: 20,
            restart_limit: 10,
        };
        let (mut selector, stats) = selector_over(&storage, "mp3", policy).await;

        assert!(selector.select_readable_file().await.is_none());

        // Threshold empty pulls to the first rewind, then one pull per
        // rewind up to the restart limit
        let bound = (policy.empty_entry_threshold + 1) * (policy.restart_limit + 1);
        assert!(stats.entry_pulls() as u32 <= bound);
        assert_eq!(stats.rewinds() as u32, policy.restart_limit + 1);
    }

    #[tokio::test]
    async fn test_counters_reset_on_success() {
        let mut storage = InMemoryStorage::new();
        storage.add_file("late.mp3", b"data");
        let policy = RetryPolicy {
            empty_entry_threshold: 2,
            restart_limit: 3,
        };
        let (mut selector, _stats) = selector_over(&storage, "mp3", policy).await;

        let file = selector.select_readable_file().await.unwrap();
        assert_eq!(file.name(), "late.mp3");
        drain(file).await;

        // After success the counters start from zero again; the wrap back to
        // late.mp3 succeeds well inside the caps
        let file = selector.select_readable_file().await.unwrap();
        assert_eq!(file.name(), "late.mp3");
        assert!(!selector.is_exhausted());
    }

    mod termination {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            // No combination of ineligible names can make selection loop
            // beyond the retry caps.
            #[test]
            fn scan_terminates_without_eligible_files(
                names in proptest::collection::vec("[a-z]{1,8}\\.(txt|wav|dat)", 0..32),
                threshold in 1u32..8,
                limit in 1u32..6,
            ) {
                let entries = names.len() as u32;
                let (selected, reads, pulls) = tokio_test::block_on(async move {
                    let mut storage = InMemoryStorage::new();
                    for (i, name) in names.iter().enumerate() {
                        storage.add_file(&format!("{i}-{name}"), b"junk");
                    }
                    let policy = RetryPolicy {
                        empty_entry_threshold: threshold,
                        restart_limit: limit,
                    };
                    let (mut selector, stats) =
                        selector_over(&storage, "mp3", policy).await;

                    let selected = selector.select_readable_file().await.is_some();
                    (selected, stats.reads(), stats.entry_pulls() as u32)
                });

                prop_assert!(!selected);
                prop_assert_eq!(reads, 0);

                let per_cycle = entries + threshold + 1;
                prop_assert!(pulls <= per_cycle * (limit + 2));
            }
        }
    }
}

//! Centralized configuration for Driftcast.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

/// Central configuration for all Driftcast components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct DriftcastConfig {
    pub storage: StorageConfig,
    pub streaming: StreamingConfig,
    pub server: ServerConfig,
}

/// Removable storage and media directory configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Mount point of the removable storage device
    pub mount_point: PathBuf,
    /// Directory under the mount point that holds the media files
    pub media_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mount_point: PathBuf::from("/mnt/media"),
            media_dir: PathBuf::from("/mnt/media"),
        }
    }
}

/// File selection and chunk pumping configuration.
///
/// Controls the name filter, transfer buffer size, pacing, and the
/// retry caps that bound every directory scan.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// File name suffix that marks an eligible media file
    pub filter_suffix: String,
    /// Transfer buffer capacity; one read never exceeds this
    pub chunk_size: usize,
    /// Pause after each forwarded chunk so listeners are not overrun
    pub pace_interval: Duration,
    /// Empty directory pulls tolerated before the cursor is rewound
    pub empty_entry_threshold: u32,
    /// Directory rewinds tolerated before a scan gives up for the tick
    pub restart_limit: u32,
    /// Sleep applied by the scheduler after a tick that did no I/O
    pub idle_backoff: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            filter_suffix: "mp3".to_string(),
            chunk_size: 512,
            pace_interval: Duration::from_millis(10),
            empty_entry_threshold: 20,
            restart_limit: 10,
            idle_backoff: Duration::from_millis(100),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the stream and status endpoints bind to
    pub port: u16,
    /// Content type reported for the live stream
    pub content_type: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            content_type: "audio/mpeg".to_string(),
        }
    }
}

impl DriftcastConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("DRIFTCAST_MEDIA_DIR") {
            config.storage.media_dir = PathBuf::from(&dir);
            config.storage.mount_point = PathBuf::from(dir);
        }

        if let Ok(suffix) = std::env::var("DRIFTCAST_FILTER_SUFFIX") {
            config.streaming.filter_suffix = suffix;
        }

        if let Ok(size) = std::env::var("DRIFTCAST_CHUNK_SIZE") {
            if let Ok(bytes) = size.parse::<usize>() {
                config.streaming.chunk_size = bytes;
            }
        }

        if let Ok(pace) = std::env::var("DRIFTCAST_PACE_MS") {
            if let Ok(millis) = pace.parse::<u64>() {
                config.streaming.pace_interval = Duration::from_millis(millis);
            }
        }

        if let Ok(limit) = std::env::var("DRIFTCAST_RESTART_LIMIT") {
            if let Ok(count) = limit.parse::<u32>() {
                config.streaming.restart_limit = count;
            }
        }

        if let Ok(port) = std::env::var("DRIFTCAST_PORT") {
            if let Ok(port_value) = port.parse::<u16>() {
                config.server.port = port_value;
            }
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Pacing and idle backoff are zeroed so tests never wait on timers.
    pub fn for_testing() -> Self {
        Self {
            streaming: StreamingConfig {
                pace_interval: Duration::ZERO,
                idle_backoff: Duration::ZERO,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use driftcast_core::config::DriftcastConfig;
use driftcast_core::storage::{FsMediaStorage, MediaStorage, MountGuard};
use driftcast_core::streaming::{
    BroadcastSink, ChunkPump, FileSelector, NameFilter, OutputSink, RetryPolicy, TickOutcome,
};
use driftcast_core::tracing_setup::{CliLogLevel, init_tracing};
use driftcast_core::{DriftcastError, Result};
use tracing::{error, info};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Stream the media directory to HTTP listeners
    Serve {
        /// Directory on the mounted storage to stream from
        #[arg(short, long)]
        media_dir: Option<PathBuf>,
        /// File name suffix that marks eligible files
        #[arg(short, long)]
        extension: Option<String>,
        /// Port for the stream and status endpoints
        #[arg(short, long)]
        port: Option<u16>,
        /// Transfer buffer size in bytes
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Pause in milliseconds after each forwarded chunk
        #[arg(long)]
        pace_ms: Option<u64>,
        /// Console log level
        #[arg(long, default_value = "info")]
        log_level: CliLogLevel,
    },
    /// List the eligible files one directory pass would find
    Scan {
        /// Directory to inspect
        media_dir: PathBuf,
        /// File name suffix that marks eligible files
        #[arg(short, long, default_value = "mp3")]
        extension: String,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Serve {
            media_dir,
            extension,
            port,
            chunk_size,
            pace_ms,
            log_level,
        } => serve(media_dir, extension, port, chunk_size, pace_ms, log_level).await,
        Commands::Scan {
            media_dir,
            extension,
        } => scan(media_dir, extension).await,
    }
}

/// Run the streaming service until the process is stopped.
///
/// Initializes storage once, spawns the HTTP server, and then drives the
/// pump as its scheduler: one tick after another, backing off briefly when a
/// tick had nothing to do.
async fn serve(
    media_dir: Option<PathBuf>,
    extension: Option<String>,
    port: Option<u16>,
    chunk_size: Option<usize>,
    pace_ms: Option<u64>,
    log_level: CliLogLevel,
) -> Result<()> {
    init_tracing(log_level.as_tracing_level(), None).map_err(|e| {
        DriftcastError::Configuration {
            reason: format!("tracing setup failed: {e}"),
        }
    })?;

    let mut config = DriftcastConfig::from_env();
    if let Some(dir) = media_dir {
        config.storage.mount_point = dir.clone();
        config.storage.media_dir = dir;
    }
    if let Some(suffix) = extension {
        config.streaming.filter_suffix = suffix;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(size) = chunk_size {
        config.streaming.chunk_size = size;
    }
    if let Some(millis) = pace_ms {
        config.streaming.pace_interval = std::time::Duration::from_millis(millis);
    }

    // Storage is verified exactly once, before the first tick
    let mount = MountGuard::new(&config.storage.mount_point);
    mount.initialize().await?;

    let storage = FsMediaStorage::new();
    let cursor = storage.open_directory(&config.storage.media_dir).await?;
    let selector = FileSelector::new(
        cursor,
        NameFilter::new(config.streaming.filter_suffix.clone()),
        RetryPolicy::from(&config.streaming),
    );

    let sink = Arc::new(BroadcastSink::new());
    let mut pump = ChunkPump::new(
        selector,
        Arc::clone(&sink) as Arc<dyn OutputSink>,
        config.streaming.chunk_size,
        config.streaming.pace_interval,
    )?;

    let server_config = config.clone();
    let server_sink = Arc::clone(&sink);
    tokio::spawn(async move {
        if let Err(e) = driftcast_web::run_server(server_config, server_sink).await {
            error!("HTTP server failed: {e}");
        }
    });

    info!(
        "Streaming *{} files from {}",
        config.streaming.filter_suffix,
        config.storage.media_dir.display()
    );

    let idle_backoff = config.streaming.idle_backoff;
    loop {
        match pump.tick().await {
            TickOutcome::Idle | TickOutcome::NoFile => {
                tokio::time::sleep(idle_backoff).await;
            }
            TickOutcome::Forwarded(_) | TickOutcome::Advanced => {}
        }
    }
}

/// List eligible files from one enumeration pass.
///
/// # Errors
/// - `DriftcastError::Storage` - Directory cannot be listed
async fn scan(media_dir: PathBuf, extension: String) -> Result<()> {
    let storage = FsMediaStorage::new();
    let mut cursor = storage.open_directory(&media_dir).await?;
    let filter = NameFilter::new(extension);

    let mut eligible = 0usize;
    let mut skipped = 0usize;
    while let Some(entry) = cursor.next_entry().await? {
        if filter.matches(entry.name()) {
            println!("  {}", entry.name());
            eligible += 1;
        } else {
            skipped += 1;
        }
    }

    println!("{eligible} eligible, {skipped} skipped in {}", media_dir.display());
    Ok(())
}

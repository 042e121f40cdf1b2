//! # media-relay
//!
//! HTTP front-end around `yt-dlp`: probe a media URL for its formats, download
//! one of them with live progress over server-sent events, then fetch the
//! result exactly once.
//!
//! ## Pipeline
//!
//! - [`probe`] normalizes extractor metadata into ranked video and audio lists
//! - [`download`] runs each download on a worker thread and relays its
//!   progress to the HTTP stream
//! - [`delivery`] holds finished files until their single retrieval
//! - [`api`] exposes all of it through axum, documented with OpenAPI
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_relay::{Config, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!
//!     // Serves until SIGTERM / SIGINT
//!     run_with_shutdown(config).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Cookie material handed to the extractor
pub mod credentials;
/// One-time delivery of finished files
pub mod delivery;
/// Background downloads and progress relay
pub mod download;
/// Error types
pub mod error;
/// Media extraction backends
pub mod extractor;
/// Format probing and normalization
pub mod probe;
/// Core types and wire frames
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use api::AppState;
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use extractor::{MediaExtractor, UnavailableExtractor, YtDlpExtractor};
pub use types::{
    AudioFormat, DownloadRequest, MediaInfo, MediaKind, VideoFormat, WireEvent, WireStatus,
};

use std::sync::Arc;

/// Run the relay until a termination signal arrives.
///
/// Startup removes workspaces left behind by a previous crash, prepares the
/// artifact directory and starts the expiry sweeper before the API server
/// begins accepting requests.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(config: Config) -> Result<()> {
    config.validate()?;
    let config = Arc::new(config);

    tokio::fs::create_dir_all(&config.download.temp_dir).await?;
    let purged = download::purge_stale_workspaces(&config.download.temp_dir).await?;
    if purged > 0 {
        tracing::info!(purged, "Removed leftovers from a previous run");
    }

    let extractor = extractor::from_config(&config.extractor);
    let state = AppState::new(Arc::clone(&config), extractor);

    tracing::info!(
        extractor = state.extractor.name(),
        cookies = state.credentials.is_configured(),
        "Extractor ready"
    );

    state.store.init().await?;
    let sweeper = state
        .store
        .spawn_sweeper(config.download.sweep_interval, config.download.artifact_ttl);

    let result = api::start_api_server(state).await;
    sweeper.abort();
    result
}

/// Resolve once the process is asked to terminate
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Resolve once the process is asked to terminate
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

//! Media extraction backends
//!
//! The [`MediaExtractor`] trait is the seam between this service and the
//! third-party tool that actually understands media sites. Implementations:
//!
//! - [`YtDlpExtractor`]: drives the external `yt-dlp` binary
//! - [`UnavailableExtractor`]: stand-in when no binary can be found
//!
//! Use [`from_config`] to pick one at startup.

mod parser;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
mod traits;
mod unavailable;
mod ytdlp;

pub use traits::{
    DownloadOptions, MediaExtractor, MediaMetadata, PostProcessing, ProbeOptions, RawFormat,
};
pub use unavailable::UnavailableExtractor;
pub use ytdlp::YtDlpExtractor;

use crate::config::ExtractorConfig;
use std::sync::Arc;

/// Select an extractor from configuration
///
/// An explicit `ytdlp_path` wins; otherwise PATH is searched when
/// `search_path` is set. Falls back to [`UnavailableExtractor`].
pub fn from_config(config: &ExtractorConfig) -> Arc<dyn MediaExtractor> {
    if let Some(path) = &config.ytdlp_path {
        tracing::info!(path = ?path, "Using configured yt-dlp binary");
        return Arc::new(YtDlpExtractor::new(path.clone()));
    }

    if config.search_path
        && let Some(extractor) = YtDlpExtractor::from_path()
    {
        tracing::info!(path = ?extractor.binary_path(), "Found yt-dlp in PATH");
        return Arc::new(extractor);
    }

    tracing::warn!("yt-dlp not available; analyze and download requests will fail");
    Arc::new(UnavailableExtractor)
}

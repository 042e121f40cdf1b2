//! Stand-in extractor used when yt-dlp cannot be found

use super::traits::{DownloadOptions, MediaExtractor, MediaMetadata, ProbeOptions};
use crate::types::ProgressUpdate;
use async_trait::async_trait;

const UNAVAILABLE: &str =
    "yt-dlp binary not found; install it or point MEDIA_RELAY_YTDLP at the executable";

/// Extractor that fails every operation
///
/// Lets the server start (and answer health checks) on hosts without
/// yt-dlp, reporting a clear error on analyze and download instead.
///
/// # Examples
///
/// ```
/// use media_relay::extractor::{MediaExtractor, ProbeOptions, UnavailableExtractor};
///
/// # #[tokio::main]
/// # async fn main() {
/// let extractor = UnavailableExtractor;
/// assert!(extractor.probe("https://example.com", &ProbeOptions::default()).await.is_err());
/// # }
/// ```
pub struct UnavailableExtractor;

#[async_trait]
impl MediaExtractor for UnavailableExtractor {
    async fn probe(&self, _url: &str, _options: &ProbeOptions) -> crate::Result<MediaMetadata> {
        Err(crate::Error::ExternalTool(UNAVAILABLE.to_string()))
    }

    fn download(
        &self,
        _url: &str,
        _options: &DownloadOptions,
        _on_progress: &mut dyn FnMut(ProgressUpdate),
    ) -> crate::Result<()> {
        Err(crate::Error::ExternalTool(UNAVAILABLE.to_string()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

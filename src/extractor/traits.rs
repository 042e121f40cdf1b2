//! Traits and types for the media extraction backend

use crate::types::ProgressUpdate;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

/// Metadata returned by a probe, in the extractor's own vocabulary
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaMetadata {
    /// Media title
    #[serde(default)]
    pub title: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Every format the extractor can deliver
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// One format entry as reported by the extractor
///
/// Codec fields use the literal `"none"` for an absent stream; a missing
/// field means "unknown" and is treated as present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFormat {
    /// Format handle understood by the extractor
    pub format_id: String,
    /// Free-form note such as "1080p60" or "medium"
    #[serde(default)]
    pub format_note: Option<String>,
    /// Resolution string such as "1920x1080" or "audio only"
    #[serde(default)]
    pub resolution: Option<String>,
    /// Container extension
    #[serde(default)]
    pub ext: Option<String>,
    /// Video codec, `"none"` for audio-only entries
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Audio codec, `"none"` for video-only entries
    #[serde(default)]
    pub acodec: Option<String>,
    /// Average audio bitrate in kbit/s
    #[serde(default)]
    pub abr: Option<f64>,
    /// Exact size in bytes
    #[serde(default)]
    pub filesize: Option<f64>,
    /// Estimated size in bytes
    #[serde(default)]
    pub filesize_approx: Option<f64>,
}

impl RawFormat {
    /// Whether the entry carries a video stream
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }

    /// Whether the entry carries an audio stream
    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref() != Some("none")
    }
}

/// Options for a metadata-only probe
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    /// Netscape cookie file to authenticate with
    pub cookie_file: Option<PathBuf>,
}

/// Conversion applied after the transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessing {
    /// Keep whatever the extractor produced
    None,
    /// Extract the audio track and encode it
    ExtractAudio {
        /// Target codec / extension (e.g. "mp3")
        codec: String,
        /// Target bitrate in kbit/s
        quality_kbps: u32,
    },
    /// Remux or re-encode the video into another container
    ConvertVideo {
        /// Target container (e.g. "mkv")
        container: String,
    },
}

/// Options for a download run
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Format handle to fetch
    pub format: String,
    /// Directory the output is written into
    pub output_dir: PathBuf,
    /// File stem of the output; the extractor appends the final extension
    pub output_name: String,
    /// Post-download conversion
    pub postprocess: PostProcessing,
    /// Netscape cookie file to authenticate with
    pub cookie_file: Option<PathBuf>,
    /// Download a single item even when the URL points into a playlist
    pub no_playlist: bool,
}

impl DownloadOptions {
    /// Output path template in the extractor's `%(field)s` syntax
    pub fn output_template(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.%(ext)s", self.output_name))
    }
}

/// Trait for the media extraction backend
///
/// `probe` is async and side-effect free. `download` is deliberately
/// blocking: it runs on a dedicated worker thread and reports progress by
/// invoking `on_progress` synchronously from that thread.
///
/// # Examples
///
/// ```no_run
/// use media_relay::extractor::{MediaExtractor, ProbeOptions, YtDlpExtractor};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = YtDlpExtractor::from_path()
///     .expect("yt-dlp not found in PATH");
///
/// let metadata = extractor
///     .probe("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &ProbeOptions::default())
///     .await?;
/// println!("{} formats", metadata.formats.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Enumerate metadata and formats without downloading anything
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ExtractionFailed`] carrying the extractor's
    /// message, or [`crate::Error::ExternalTool`] if the backend cannot run.
    async fn probe(&self, url: &str, options: &ProbeOptions) -> crate::Result<MediaMetadata>;

    /// Download (and convert) one format, blocking until finished
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ExtractionFailed`] carrying the extractor's
    /// message, or [`crate::Error::ExternalTool`] if the backend cannot run.
    fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        on_progress: &mut dyn FnMut(ProgressUpdate),
    ) -> crate::Result<()>;

    /// Human-readable name for logging and health reporting
    fn name(&self) -> &'static str;
}

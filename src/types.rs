//! Core types for media-relay

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Kind of media a download produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio only, converted to the requested codec
    Audio,
    /// Video (with or without an audio track)
    Video,
}

impl std::str::FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            other => Err(Error::BadRequest(format!(
                "type must be 'audio' or 'video', got '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// A selectable video format
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoFormat {
    /// Extractor-specific format handle, passed back verbatim on download
    pub format_id: String,
    /// Ordinal quality label such as "1080p" (or the reported resolution, or "N/A")
    pub quality: String,
    /// Container extension reported by the extractor
    pub ext: Option<String>,
    /// Approximate size rendered as "12.34 MB", or "N/A"
    pub filesize: String,
    /// Whether the stream carries an audio track
    pub has_audio: bool,
}

/// A selectable audio-only format
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AudioFormat {
    /// Extractor-specific format handle, passed back verbatim on download
    pub format_id: String,
    /// Bitrate label such as "128k", or "Beste" when unknown
    pub quality: String,
    /// Container extension reported by the extractor
    pub ext: Option<String>,
    /// Approximate size rendered as "12.34 MB", or "N/A"
    pub filesize: String,
}

/// Normalized result of a metadata probe
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MediaInfo {
    /// Media title
    pub title: Option<String>,
    /// Duration as "MM:SS" / "HH:MM:SS", or "N/A"
    pub duration: String,
    /// Thumbnail URL
    pub thumbnail: Option<String>,
    /// Video formats ranked by descending quality
    pub video_formats: Vec<VideoFormat>,
    /// Audio formats ranked by descending bitrate
    pub audio_formats: Vec<AudioFormat>,
}

/// A validated download request; every field is present before work starts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Source media URL (http/https)
    pub url: String,
    /// Audio or video
    pub kind: MediaKind,
    /// Format handle chosen from a previous probe
    pub format_id: String,
    /// Target container / codec extension, e.g. "mp3" or "mkv"
    pub container: String,
    /// File stem for the produced artifact
    pub output_name: String,
}

/// Raw progress strings as reported by the extractor
///
/// Every field is optional; the extractor omits whatever it cannot estimate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawProgress {
    /// Percentage string, possibly padded and carrying ANSI colour codes (e.g. " 45.2%")
    pub percent: Option<String>,
    /// Total size string (e.g. "12.34MiB")
    pub total: Option<String>,
    /// Transfer rate string (e.g. "1.20MiB/s")
    pub speed: Option<String>,
    /// Remaining time string (e.g. "00:07")
    pub eta: Option<String>,
}

/// A progress notification delivered by the extractor's callback
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// Bytes are flowing
    Downloading(RawProgress),
    /// Transfer finished; post-processing may follow
    Finished,
}

/// Handle to a completed file waiting in the artifact store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedArtifact {
    /// Absolute location inside the artifact store
    pub path: PathBuf,
    /// Public, single-path-component retrieval handle
    pub handle: String,
}

/// Message travelling from the download worker to the progress relay
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Forwarded download progress
    Downloading(RawProgress),
    /// Forwarded completion of the transfer phase
    Finished,
    /// Terminal failure; always followed by [`ProgressEvent::Done`]
    Error(String),
    /// Sentinel emitted exactly once as the worker's last action
    Done(Option<DownloadedArtifact>),
}

impl From<ProgressUpdate> for ProgressEvent {
    fn from(update: ProgressUpdate) -> Self {
        match update {
            ProgressUpdate::Downloading(raw) => ProgressEvent::Downloading(raw),
            ProgressUpdate::Finished => ProgressEvent::Finished,
        }
    }
}

/// Status of a frame on the progress stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WireStatus {
    /// Transfer in progress
    Downloading,
    /// Transfer done, conversion running
    Finished,
    /// Artifact ready for retrieval
    Complete,
    /// Terminal failure
    Error,
}

/// One JSON frame on the `text/event-stream` progress stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WireEvent {
    /// Frame status
    pub status: WireStatus,
    /// Progress percentage (0.0 to 100.0), present on progress frames
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    /// Human-readable message
    pub message: String,
    /// Retrieval path, present on the `complete` frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

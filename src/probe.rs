//! Format probing and normalization
//!
//! [`FormatProber`] asks the extractor for metadata only and turns the raw
//! format list into the ranked [`MediaInfo`] the API returns.

use crate::credentials::CredentialProvisioner;
use crate::error::{Error, Result};
use crate::extractor::{MediaExtractor, MediaMetadata, ProbeOptions, RawFormat};
use crate::types::{AudioFormat, MediaInfo, VideoFormat};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const NOT_AVAILABLE: &str = "N/A";

/// Quality label for audio formats with unknown bitrate
const BEST_AUDIO: &str = "Beste";

/// Runs metadata-only probes through the configured extractor
#[derive(Clone)]
pub struct FormatProber {
    extractor: Arc<dyn MediaExtractor>,
    credentials: CredentialProvisioner,
    timeout: Duration,
}

impl FormatProber {
    /// Create a prober bounded by `timeout` per probe
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        credentials: CredentialProvisioner,
        timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            credentials,
            timeout,
        }
    }

    /// Probe `url` and return its normalized, ranked formats
    ///
    /// # Errors
    ///
    /// Any extractor failure (or timeout) is returned as a single error
    /// carrying its message. There is no retry.
    pub async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let cookies = self.credentials.provision()?;
        let options = ProbeOptions {
            cookie_file: cookies.as_ref().map(|c| c.path().to_path_buf()),
        };

        tracing::debug!(url, extractor = self.extractor.name(), "Probing media");

        let metadata = tokio::time::timeout(self.timeout, self.extractor.probe(url, &options))
            .await
            .map_err(|_| {
                Error::ExtractionFailed(format!(
                    "probe timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })??;

        drop(cookies);

        let info = normalize(metadata);
        tracing::info!(
            url,
            video_formats = info.video_formats.len(),
            audio_formats = info.audio_formats.len(),
            "Probe complete"
        );
        Ok(info)
    }
}

/// Convert extractor metadata into ranked video and audio format lists
pub fn normalize(metadata: MediaMetadata) -> MediaInfo {
    let mut video_formats = Vec::new();
    let mut audio_formats = Vec::new();

    for format in &metadata.formats {
        if !format.has_video() && !format.has_audio() {
            continue;
        }

        let filesize = format_filesize(format.filesize.or(format.filesize_approx));

        if format.has_video() {
            video_formats.push(VideoFormat {
                format_id: format.format_id.clone(),
                quality: video_quality(format),
                ext: format.ext.clone(),
                filesize,
                has_audio: format.has_audio(),
            });
        } else {
            audio_formats.push(AudioFormat {
                format_id: format.format_id.clone(),
                quality: audio_quality(format.abr),
                ext: format.ext.clone(),
                filesize,
            });
        }
    }

    video_formats.sort_by(|a, b| by_rank_descending(&a.quality, &b.quality));
    audio_formats.sort_by(|a, b| by_rank_descending(&a.quality, &b.quality));

    MediaInfo {
        title: metadata.title,
        duration: parse_duration(metadata.duration),
        thumbnail: metadata.thumbnail,
        video_formats,
        audio_formats,
    }
}

/// Render a duration in seconds as `MM:SS`, or `HH:MM:SS` from one hour up
///
/// # Examples
///
/// ```
/// use media_relay::probe::parse_duration;
///
/// assert_eq!(parse_duration(Some(59.0)), "00:59");
/// assert_eq!(parse_duration(Some(3661.0)), "01:01:01");
/// assert_eq!(parse_duration(None), "N/A");
/// ```
pub fn parse_duration(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|s| s.is_finite()) else {
        return NOT_AVAILABLE.to_string();
    };

    let total = seconds.max(0.0) as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

// Constant pattern, exercised by the tests below
#[allow(clippy::expect_used)]
fn quality_pattern() -> &'static Regex {
    static QUALITY: OnceLock<Regex> = OnceLock::new();
    QUALITY.get_or_init(|| Regex::new(r"(\d{3,4}p)").expect("valid quality pattern"))
}

fn video_quality(format: &RawFormat) -> String {
    format
        .format_note
        .as_deref()
        .and_then(|note| quality_pattern().find(note))
        .map(|m| m.as_str().to_string())
        .or_else(|| format.resolution.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn audio_quality(abr: Option<f64>) -> String {
    match abr {
        Some(abr) if abr > 0.0 && abr.fract() == 0.0 => format!("{}k", abr as u64),
        Some(abr) if abr > 0.0 => format!("{}k", abr),
        _ => BEST_AUDIO.to_string(),
    }
}

fn format_filesize(bytes: Option<f64>) -> String {
    match bytes {
        Some(bytes) if bytes > 0.0 => format!("{:.2} MB", bytes / (1024.0 * 1024.0)),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Numeric rank of a quality label: everything but the unit suffix must be a number
fn rank(quality: &str) -> Option<f64> {
    let mut chars = quality.chars();
    chars.next_back()?;
    let number = chars.as_str();
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    number.parse().ok()
}

fn by_rank_descending(a: &str, b: &str) -> Ordering {
    match (rank(a), rank(b)) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialConfig;
    use crate::extractor::test_helpers::FakeExtractor;

    fn video(id: &str, note: Option<&str>, resolution: Option<&str>) -> RawFormat {
        RawFormat {
            format_id: id.to_string(),
            format_note: note.map(str::to_string),
            resolution: resolution.map(str::to_string),
            ext: Some("mp4".to_string()),
            vcodec: Some("avc1".to_string()),
            acodec: Some("none".to_string()),
            ..RawFormat::default()
        }
    }

    fn audio(id: &str, abr: Option<f64>) -> RawFormat {
        RawFormat {
            format_id: id.to_string(),
            ext: Some("m4a".to_string()),
            vcodec: Some("none".to_string()),
            acodec: Some("mp4a.40.2".to_string()),
            abr,
            ..RawFormat::default()
        }
    }

    #[test]
    fn parse_duration_boundaries() {
        assert_eq!(parse_duration(Some(0.0)), "00:00");
        assert_eq!(parse_duration(Some(59.0)), "00:59");
        assert_eq!(parse_duration(Some(60.0)), "01:00");
        assert_eq!(parse_duration(Some(3599.9)), "59:59");
        assert_eq!(parse_duration(Some(3661.0)), "01:01:01");
        assert_eq!(parse_duration(None), "N/A");
        assert_eq!(parse_duration(Some(f64::NAN)), "N/A");
    }

    #[test]
    fn video_quality_prefers_note_token_then_resolution() {
        assert_eq!(video_quality(&video("1", Some("1080p60 HDR"), None)), "1080p");
        assert_eq!(video_quality(&video("2", Some("DASH"), Some("640x360"))), "640x360");
        assert_eq!(video_quality(&video("3", None, None)), "N/A");
    }

    #[test]
    fn audio_quality_renders_bitrate() {
        assert_eq!(audio_quality(Some(128.0)), "128k");
        assert_eq!(audio_quality(Some(129.478)), "129.478k");
        assert_eq!(audio_quality(Some(0.0)), "Beste");
        assert_eq!(audio_quality(None), "Beste");
    }

    #[test]
    fn filesize_uses_mebibytes_with_two_decimals() {
        assert_eq!(format_filesize(Some(1048576.0)), "1.00 MB");
        assert_eq!(format_filesize(Some(12_939_428.0)), "12.34 MB");
        assert_eq!(format_filesize(Some(0.0)), "N/A");
        assert_eq!(format_filesize(None), "N/A");
    }

    #[test]
    fn formats_without_any_stream_are_dropped() {
        let metadata = MediaMetadata {
            formats: vec![RawFormat {
                format_id: "sb0".to_string(),
                vcodec: Some("none".to_string()),
                acodec: Some("none".to_string()),
                ..RawFormat::default()
            }],
            ..MediaMetadata::default()
        };

        let info = normalize(metadata);
        assert!(info.video_formats.is_empty());
        assert!(info.audio_formats.is_empty());
    }

    #[test]
    fn video_formats_rank_descending_with_non_numeric_last_and_stable() {
        let metadata = MediaMetadata {
            formats: vec![
                video("a", Some("360p"), None),
                video("b", None, Some("1920x1080")),
                video("c", Some("1080p"), None),
                video("d", Some("720p"), None),
                video("e", None, None),
                video("f", Some("1080p"), None),
            ],
            ..MediaMetadata::default()
        };

        let info = normalize(metadata);
        assert_eq!(
            info.video_formats
                .iter()
                .map(|f| f.format_id.as_str())
                .collect::<Vec<_>>(),
            ["c", "f", "d", "a", "b", "e"]
        );
    }

    #[test]
    fn audio_formats_rank_by_bitrate() {
        let metadata = MediaMetadata {
            formats: vec![
                audio("low", Some(48.0)),
                audio("unknown", None),
                audio("high", Some(160.0)),
                audio("mid", Some(129.478)),
            ],
            ..MediaMetadata::default()
        };

        let info = normalize(metadata);
        assert_eq!(
            info.audio_formats
                .iter()
                .map(|f| f.format_id.as_str())
                .collect::<Vec<_>>(),
            ["high", "mid", "low", "unknown"]
        );
    }

    #[test]
    fn muxed_format_is_video_with_audio() {
        let format = RawFormat {
            format_id: "18".to_string(),
            format_note: Some("360p".to_string()),
            vcodec: Some("avc1.42001E".to_string()),
            acodec: Some("mp4a.40.2".to_string()),
            filesize_approx: Some(2_097_152.0),
            ..RawFormat::default()
        };
        let info = normalize(MediaMetadata {
            title: Some("Clip".to_string()),
            duration: Some(61.0),
            formats: vec![format],
            ..MediaMetadata::default()
        });

        assert_eq!(info.title.as_deref(), Some("Clip"));
        assert_eq!(info.duration, "01:01");
        assert_eq!(info.video_formats.len(), 1);
        assert!(info.video_formats[0].has_audio);
        assert_eq!(info.video_formats[0].filesize, "2.00 MB");
        assert!(info.audio_formats.is_empty());
    }

    #[tokio::test]
    async fn extractor_error_is_surfaced_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let prober = FormatProber::new(
            Arc::new(FakeExtractor::new().with_probe_error("ERROR: Unsupported URL")),
            CredentialProvisioner::new(&CredentialConfig::default(), dir.path()),
            Duration::from_secs(5),
        );

        let err = prober.probe("https://example.com").await.unwrap_err();
        assert_eq!(err.to_string(), "ERROR: Unsupported URL");
    }

    #[tokio::test]
    async fn cookie_file_does_not_outlive_probe() {
        let dir = tempfile::tempdir().unwrap();
        let prober = FormatProber::new(
            Arc::new(FakeExtractor::new()),
            CredentialProvisioner::new(
                &CredentialConfig {
                    cookies: Some("cookie".to_string()),
                },
                dir.path(),
            ),
            Duration::from_secs(5),
        );

        prober.probe("https://example.com").await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

//! Parsers for yt-dlp output

use super::traits::MediaMetadata;
use crate::types::{ProgressUpdate, RawProgress};

/// Marker prepended to every progress line we ask yt-dlp to print
pub(crate) const PROGRESS_PREFIX: &str = "media-relay-progress:";

/// `--progress-template` value producing lines understood by [`parse_progress_line`]
///
/// The `download:` selector is consumed by yt-dlp and never printed.
pub(crate) const PROGRESS_TEMPLATE: &str = "download:media-relay-progress:%(progress.status)s|%(progress._percent_str)s|%(progress._total_bytes_str)s|%(progress._speed_str)s|%(progress._eta_str)s";

/// Value yt-dlp substitutes for a field it cannot compute
const NOT_AVAILABLE: &str = "NA";

/// Parse the JSON document printed by `--dump-single-json`
pub(crate) fn parse_metadata(stdout: &[u8]) -> crate::Result<MediaMetadata> {
    serde_json::from_slice(stdout).map_err(|e| {
        crate::Error::ExtractionFailed(format!("yt-dlp returned unreadable metadata: {}", e))
    })
}

/// Parse one stdout line into a progress notification
///
/// Lines without [`PROGRESS_PREFIX`] (yt-dlp's own chatter) and statuses
/// other than `downloading`/`finished` yield `None`.
pub(crate) fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let payload = line.trim_end_matches(['\r', '\n']).strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = payload.split('|');

    let status = fields.next()?;
    match status.trim() {
        "downloading" => {
            let mut next = || fields.next().and_then(available);
            Some(ProgressUpdate::Downloading(RawProgress {
                percent: next(),
                total: next(),
                speed: next(),
                eta: next(),
            }))
        }
        "finished" => Some(ProgressUpdate::Finished),
        _ => None,
    }
}

fn available(field: &str) -> Option<String> {
    if field.trim().is_empty() || field.trim() == NOT_AVAILABLE {
        None
    } else {
        Some(field.to_string())
    }
}

/// Pick the most useful failure message from yt-dlp's stderr
///
/// Prefers the last `ERROR:` line, falls back to the last non-empty line.
pub(crate) fn failure_message<'a, I>(stderr_lines: I, fallback: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let lines: Vec<&str> = stderr_lines
        .into_iter()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

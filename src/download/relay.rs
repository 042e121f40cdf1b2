//! Progress relay: queue events to wire frames
//!
//! The relay is the single consumer of a download's progress channel. It
//! maps raw extractor progress onto the stable [`WireEvent`] schema and stops
//! after the first terminal frame (`complete` or `error`).

use super::workspace::{TempWorkspace, WorkspaceGuard};
use crate::error::Error;
use crate::types::{DownloadedArtifact, ProgressEvent, RawProgress, WireEvent, WireStatus};
use crate::utils::strip_ansi;
use futures::Stream;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Path prefix under which artifacts are retrieved
pub const DOWNLOAD_FILE_ROUTE: &str = "/api/download_file";

/// Async consumer turning a download's progress channel into frames
///
/// Dropping the relay (stream finished or client gone) removes the request's
/// workspace.
#[derive(Debug)]
pub struct ProgressRelay {
    download_id: String,
    rx: UnboundedReceiver<ProgressEvent>,
    finished: bool,
    _teardown: WorkspaceGuard,
}

impl ProgressRelay {
    pub(crate) fn new(
        download_id: String,
        rx: UnboundedReceiver<ProgressEvent>,
        workspace: Arc<TempWorkspace>,
    ) -> Self {
        Self {
            download_id,
            rx,
            finished: false,
            _teardown: WorkspaceGuard::new(workspace),
        }
    }

    /// Identifier used in log lines for this download
    pub fn download_id(&self) -> &str {
        &self.download_id
    }

    /// Wait for the next frame; `None` once a terminal frame has been yielded
    pub async fn next_frame(&mut self) -> Option<WireEvent> {
        if self.finished {
            return None;
        }

        let frame = match self.rx.recv().await {
            Some(ProgressEvent::Downloading(raw)) => downloading_frame(&raw),
            Some(ProgressEvent::Finished) => finished_frame(),
            Some(ProgressEvent::Error(message)) => error_frame(message),
            Some(ProgressEvent::Done(Some(artifact))) => complete_frame(&artifact),
            Some(ProgressEvent::Done(None)) => error_frame(Error::ArtifactMissing.to_string()),
            None => {
                tracing::warn!(download_id = %self.download_id, "Download worker vanished without finishing");
                error_frame("Download ended unexpectedly".to_string())
            }
        };

        if matches!(frame.status, WireStatus::Complete | WireStatus::Error) {
            self.finished = true;
            tracing::debug!(download_id = %self.download_id, status = ?frame.status, "Progress stream finished");
        }
        Some(frame)
    }

    /// Consume the relay as a stream of frames
    pub fn into_stream(self) -> impl Stream<Item = WireEvent> + Send {
        futures::stream::unfold(self, |mut relay| async move {
            relay.next_frame().await.map(|frame| (frame, relay))
        })
    }
}

/// Frame for a `downloading` notification
///
/// ANSI control sequences are stripped from every part; an absent or
/// unparseable percentage becomes `0.0`.
pub fn downloading_frame(raw: &RawProgress) -> WireEvent {
    let clean = |part: &Option<String>| {
        part.as_deref()
            .map(|s| strip_ansi(s).trim().to_string())
            .unwrap_or_default()
    };

    let percent_text = clean(&raw.percent);
    let percent = percent_text
        .replace('%', "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .unwrap_or(0.0);

    WireEvent {
        status: WireStatus::Downloading,
        percent: Some(percent),
        message: format!(
            "Downloading: {} of {} at {} ETA {}",
            percent_text,
            clean(&raw.total),
            clean(&raw.speed),
            clean(&raw.eta)
        ),
        file_url: None,
    }
}

/// Frame for the end of the transfer phase
pub fn finished_frame() -> WireEvent {
    WireEvent {
        status: WireStatus::Finished,
        percent: Some(100.0),
        message: "Download complete, converting...".to_string(),
        file_url: None,
    }
}

/// Terminal failure frame
pub fn error_frame(message: String) -> WireEvent {
    WireEvent {
        status: WireStatus::Error,
        percent: None,
        message,
        file_url: None,
    }
}

/// Terminal success frame pointing at the retrieval route
pub fn complete_frame(artifact: &DownloadedArtifact) -> WireEvent {
    WireEvent {
        status: WireStatus::Complete,
        percent: None,
        message: "Process complete.".to_string(),
        file_url: Some(format!(
            "{}/{}",
            DOWNLOAD_FILE_ROUTE,
            urlencoding::encode(&artifact.handle)
        )),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::path::PathBuf;
    use tokio::sync::mpsc::unbounded_channel;

    fn raw(percent: Option<&str>) -> RawProgress {
        RawProgress {
            percent: percent.map(str::to_string),
            total: Some("10.00MiB".to_string()),
            speed: Some("1.00MiB/s".to_string()),
            eta: Some("00:05".to_string()),
        }
    }

    async fn relay() -> (
        ProgressRelay,
        tokio::sync::mpsc::UnboundedSender<ProgressEvent>,
        tempfile::TempDir,
    ) {
        let root = tempfile::tempdir().unwrap();
        let workspace = Arc::new(TempWorkspace::create(root.path()).await.unwrap());
        let (tx, rx) = unbounded_channel();
        (ProgressRelay::new("t".to_string(), rx, workspace), tx, root)
    }

    #[test]
    fn downloading_frame_strips_ansi_and_percent_sign() {
        let frame = downloading_frame(&raw(Some("\x1b[0;94m 45.2%\x1b[0m")));

        assert_eq!(frame.status, WireStatus::Downloading);
        assert_eq!(frame.percent, Some(45.2));
        assert_eq!(
            frame.message,
            "Downloading: 45.2% of 10.00MiB at 1.00MiB/s ETA 00:05"
        );
    }

    #[test]
    fn unparseable_or_missing_percent_is_zero() {
        assert_eq!(downloading_frame(&raw(Some("Unknown%"))).percent, Some(0.0));
        assert_eq!(downloading_frame(&raw(None)).percent, Some(0.0));
    }

    #[test]
    fn missing_parts_render_empty() {
        let frame = downloading_frame(&RawProgress {
            percent: Some("5%".to_string()),
            ..RawProgress::default()
        });
        assert_eq!(frame.message, "Downloading: 5% of  at  ETA ");
    }

    #[test]
    fn complete_frame_encodes_handle() {
        let frame = complete_frame(&DownloadedArtifact {
            path: PathBuf::from("/tmp/artifacts/my song.mp3"),
            handle: "my song.mp3".to_string(),
        });

        assert_eq!(frame.status, WireStatus::Complete);
        assert_eq!(frame.message, "Process complete.");
        assert_eq!(
            frame.file_url.as_deref(),
            Some("/api/download_file/my%20song.mp3")
        );
    }

    #[tokio::test]
    async fn three_events_become_three_frames() {
        let (relay, tx, _root) = relay().await;
        tx.send(ProgressEvent::Downloading(raw(Some("50%")))).unwrap();
        tx.send(ProgressEvent::Finished).unwrap();
        tx.send(ProgressEvent::Done(Some(DownloadedArtifact {
            path: PathBuf::from("/x/a.mp3"),
            handle: "a.mp3".to_string(),
        })))
        .unwrap();

        let frames: Vec<WireEvent> = relay.into_stream().collect().await;

        let statuses: Vec<WireStatus> = frames.iter().map(|f| f.status).collect();
        assert_eq!(
            statuses,
            [WireStatus::Downloading, WireStatus::Finished, WireStatus::Complete]
        );
        assert_eq!(frames[0].percent, Some(50.0));
        assert_eq!(frames[1].percent, Some(100.0));
    }

    #[tokio::test]
    async fn error_ends_stream_without_waiting_for_done() {
        let (relay, tx, _root) = relay().await;
        tx.send(ProgressEvent::Error("ERROR: boom".to_string())).unwrap();

        let frames: Vec<WireEvent> = relay.into_stream().collect().await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].status, WireStatus::Error);
        assert_eq!(frames[0].message, "ERROR: boom");
        drop(tx);
    }

    #[tokio::test]
    async fn done_without_artifact_is_an_error() {
        let (relay, tx, _root) = relay().await;
        tx.send(ProgressEvent::Done(None)).unwrap();

        let frames: Vec<WireEvent> = relay.into_stream().collect().await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message, "Download completed but file not found");
    }

    #[tokio::test]
    async fn closed_channel_without_done_is_an_error() {
        let (relay, tx, _root) = relay().await;
        tx.send(ProgressEvent::Finished).unwrap();
        drop(tx);

        let frames: Vec<WireEvent> = relay.into_stream().collect().await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].status, WireStatus::Error);
    }

    #[tokio::test]
    async fn dropping_relay_removes_workspace() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Arc::new(TempWorkspace::create(root.path()).await.unwrap());
        let (_tx, rx) = unbounded_channel();
        let relay = ProgressRelay::new("t".to_string(), rx, Arc::clone(&workspace));

        assert!(workspace.path().exists());
        drop(relay);
        assert!(!workspace.path().exists());
    }
}

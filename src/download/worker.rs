//! Background download worker
//!
//! Each download runs the extractor's blocking `download` on its own OS
//! thread. Progress callbacks are forwarded onto an unbounded channel; the
//! worker's last action is always exactly one [`ProgressEvent::Done`].

use super::workspace::TempWorkspace;
use crate::credentials::CookieFile;
use crate::delivery::ArtifactStore;
use crate::error::{Error, Result};
use crate::extractor::{DownloadOptions, MediaExtractor};
use crate::types::{DownloadedArtifact, ProgressEvent, ProgressUpdate};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::OwnedSemaphorePermit;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::error::SendError;

/// Everything one download needs, moved onto the worker thread
pub struct DownloadWorker {
    pub(crate) id: String,
    pub(crate) url: String,
    pub(crate) options: DownloadOptions,
    pub(crate) extractor: Arc<dyn MediaExtractor>,
    pub(crate) store: ArtifactStore,
    pub(crate) workspace: Arc<TempWorkspace>,
    pub(crate) cookies: Option<CookieFile>,
    pub(crate) permit: Option<OwnedSemaphorePermit>,
}

impl DownloadWorker {
    /// Start the download on a dedicated thread
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the OS refuses to spawn the thread; nothing
    /// has been sent on `tx` in that case.
    pub fn start(self, tx: UnboundedSender<ProgressEvent>) -> Result<JoinHandle<()>> {
        let name = format!("download-{}", self.id);
        std::thread::Builder::new()
            .name(name)
            .spawn(move || self.run(tx))
            .map_err(Error::Io)
    }

    fn run(self, tx: UnboundedSender<ProgressEvent>) {
        let DownloadWorker {
            id,
            url,
            options,
            extractor,
            store,
            workspace,
            cookies,
            permit,
        } = self;

        tracing::info!(
            download_id = %id,
            url = %url,
            format = %options.format,
            extractor = extractor.name(),
            "Download started"
        );

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut forward = |update: ProgressUpdate| {
                let _ = tx.send(ProgressEvent::from(update));
            };
            extractor.download(&url, &options, &mut forward)
        }));

        let artifact = match outcome {
            Ok(Ok(())) => collect_artifact(&id, &options, &workspace, &store, &tx),
            Ok(Err(e)) => {
                tracing::warn!(download_id = %id, error = %e, "Download failed");
                let _ = tx.send(ProgressEvent::Error(e.to_string()));
                None
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(download_id = %id, panic = %message, "Download worker panicked");
                let _ = tx.send(ProgressEvent::Error(format!(
                    "Download failed unexpectedly: {}",
                    message
                )));
                None
            }
        };

        let delivered = send_done(&id, artifact, &tx);

        drop(cookies);
        workspace.remove();
        drop(permit);

        tracing::info!(download_id = %id, delivered, "Download worker finished");
    }
}

/// Locate the produced file and move it into the store
///
/// Skipped when nobody is listening any more; the file then disappears with
/// the workspace.
fn collect_artifact(
    id: &str,
    options: &DownloadOptions,
    workspace: &TempWorkspace,
    store: &ArtifactStore,
    tx: &UnboundedSender<ProgressEvent>,
) -> Option<DownloadedArtifact> {
    if tx.is_closed() {
        tracing::info!(download_id = %id, "Client disconnected; discarding download");
        return None;
    }

    let Some(output) = workspace.find_output(&options.output_name) else {
        tracing::warn!(download_id = %id, output_name = %options.output_name, "Extractor produced no output file");
        return None;
    };

    match store.adopt(&output) {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            tracing::error!(download_id = %id, error = %e, "Failed to store downloaded file");
            let _ = tx.send(ProgressEvent::Error(
                "Download completed but the file could not be stored".to_string(),
            ));
            None
        }
    }
}

/// Send the final `Done` event; returns whether an artifact reached the relay
///
/// The client may leave after [`collect_artifact`] checked the channel. The
/// adopted file then has no reader and is deleted right away.
fn send_done(
    id: &str,
    artifact: Option<DownloadedArtifact>,
    tx: &UnboundedSender<ProgressEvent>,
) -> bool {
    let delivered = artifact.is_some();
    match tx.send(ProgressEvent::Done(artifact)) {
        Ok(()) => delivered,
        Err(SendError(ProgressEvent::Done(Some(orphan)))) => {
            match std::fs::remove_file(&orphan.path) {
                Ok(()) => {
                    tracing::info!(download_id = %id, handle = %orphan.handle, "Client disconnected; deleted stored download");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(download_id = %id, path = ?orphan.path, error = %e, "Failed to delete orphaned download");
                }
            }
            false
        }
        Err(_) => {
            tracing::debug!(download_id = %id, "Progress stream already closed");
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

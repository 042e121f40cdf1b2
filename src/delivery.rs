//! One-time artifact delivery
//!
//! Completed downloads are moved out of their workspace into the
//! [`ArtifactStore`] under a public handle. A handle can be opened exactly
//! once: opening atomically claims the file, and the claimed file is deleted
//! as soon as the response body is dropped (fully sent or abandoned).

use crate::error::{Error, Result};
use crate::types::DownloadedArtifact;
use crate::utils::{get_unique_path, is_valid_handle};
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Prefix of files that have been claimed by an in-flight delivery
const CLAIM_PREFIX: &str = ".claimed-";

/// Directory of completed artifacts awaiting retrieval
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    root: PathBuf,
    // serializes handle reservation between concurrent adoptions
    adopt_lock: Mutex<()>,
}

impl ArtifactStore {
    /// Create a store rooted at `root`; the directory is created on demand
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                root: root.into(),
                adopt_lock: Mutex::new(()),
            }),
        }
    }

    /// Directory holding the artifacts
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Ensure the store directory exists
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.root()).await?;
        Ok(())
    }

    /// Move a finished file into the store and assign it a handle
    ///
    /// Blocking; called from the download worker thread. The handle is the
    /// file name, with ` (1)`, ` (2)`, ... appended to the stem on collision.
    pub fn adopt(&self, source: &Path) -> Result<DownloadedArtifact> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| is_valid_handle(n))
            .ok_or(Error::ArtifactMissing)?;

        let _reservation = self
            .inner
            .adopt_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        std::fs::create_dir_all(self.root())?;
        let target = get_unique_path(&self.root().join(file_name))?;

        match std::fs::rename(source, &target) {
            Ok(()) => {}
            // a delivery may have removed the emptied store directory in between
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && source.exists() => {
                std::fs::create_dir_all(self.root())?;
                std::fs::rename(source, &target)?;
            }
            Err(e) => return Err(e.into()),
        }

        let handle = target
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or(Error::ArtifactMissing)?;

        tracing::info!(handle = %handle, "Artifact ready for retrieval");
        Ok(DownloadedArtifact {
            path: target,
            handle,
        })
    }

    /// Claim the artifact behind `handle` for delivery
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for malformed, unknown and already-delivered
    /// handles. Malformed handles never touch the filesystem.
    pub async fn open(&self, handle: &str) -> Result<DeliveredFile> {
        if !is_valid_handle(handle) {
            return Err(Error::NotFound("file".to_string()));
        }

        let source = self.root().join(handle);
        let claimed = self.root().join(format!(
            "{}{}-{}",
            CLAIM_PREFIX,
            uuid::Uuid::new_v4().simple(),
            handle
        ));

        match tokio::fs::rename(&source, &claimed).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound("file".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let claim = Claim { path: claimed };
        let file = File::open(&claim.path).await?;
        let len = file.metadata().await?.len();

        tracing::info!(handle, bytes = len, "Delivering artifact");
        Ok(DeliveredFile {
            file_name: handle.to_string(),
            len,
            body: DeliveryStream {
                inner: ReaderStream::new(file),
                _claim: claim,
            },
        })
    }

    /// Delete artifacts (and abandoned claims) older than `ttl`
    ///
    /// Returns the number of files deleted.
    pub async fn sweep_expired(&self, ttl: Duration) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(self.root()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut swept = 0;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .unwrap_or_default();
            if age < ttl {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    swept += 1;
                    tracing::info!(path = ?entry.path(), age_secs = age.as_secs(), "Deleted unretrieved artifact");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = ?entry.path(), error = %e, "Failed to delete expired artifact"),
            }
        }
        Ok(swept)
    }

    /// Run [`ArtifactStore::sweep_expired`] every `interval` in the background
    pub fn spawn_sweeper(&self, interval: Duration, ttl: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = store.sweep_expired(ttl).await {
                    tracing::warn!(error = %e, "Artifact sweep failed");
                }
            }
        })
    }
}

/// A claimed artifact ready to be streamed to the client
#[derive(Debug)]
pub struct DeliveredFile {
    /// Name presented to the client
    pub file_name: String,
    /// Size in bytes
    pub len: u64,
    /// File contents; the artifact is deleted when this is dropped
    pub body: DeliveryStream,
}

impl DeliveredFile {
    /// `Content-Disposition` value offering the file as an attachment
    ///
    /// Carries an ASCII fallback name plus the exact name in RFC 5987 form.
    pub fn content_disposition(&self) -> String {
        let fallback: String = self
            .file_name
            .chars()
            .map(|c| {
                if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(&self.file_name)
        )
    }
}

/// Byte stream over a claimed artifact
#[derive(Debug)]
pub struct DeliveryStream {
    inner: ReaderStream<File>,
    _claim: Claim,
}

impl Stream for DeliveryStream {
    type Item = <ReaderStream<File> as Stream>::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Deletes the claimed file, and its directory if that became empty
#[derive(Debug)]
struct Claim {
    path: PathBuf,
}

impl Drop for Claim {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = ?self.path, "Deleted delivered artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = ?self.path, error = %e, "Failed to delete delivered artifact"),
        }

        // fails harmlessly while other artifacts are waiting
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::remove_dir(parent);
        }
    }
}

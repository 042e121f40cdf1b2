//! Download pipeline split into focused submodules.
//!
//! - [`workspace`] - Per-request temporary directories
//! - [`worker`] - Blocking extractor run on a dedicated thread
//! - [`relay`] - Queue consumer producing wire frames
//!
//! [`DownloadService::start`] wires them together: it admits the request,
//! provisions a workspace and credentials, starts the worker and hands back
//! the relay the HTTP layer streams to the client.

pub mod relay;
pub mod worker;
pub mod workspace;

pub use relay::ProgressRelay;
pub use worker::DownloadWorker;
pub use workspace::{TempWorkspace, WorkspaceGuard, purge_stale_workspaces};

use crate::config::DownloadConfig;
use crate::credentials::CredentialProvisioner;
use crate::delivery::ArtifactStore;
use crate::error::{Error, Result};
use crate::extractor::{DownloadOptions, MediaExtractor, PostProcessing};
use crate::types::{DownloadRequest, MediaKind};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Starts downloads and enforces the optional concurrency limit
#[derive(Clone)]
pub struct DownloadService {
    extractor: Arc<dyn MediaExtractor>,
    store: ArtifactStore,
    credentials: CredentialProvisioner,
    config: DownloadConfig,
    slots: Option<Arc<Semaphore>>,
}

impl DownloadService {
    /// Create a service using `extractor` and delivering into `store`
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        store: ArtifactStore,
        credentials: CredentialProvisioner,
        config: DownloadConfig,
    ) -> Self {
        let slots = config
            .max_concurrent_downloads
            .map(|limit| Arc::new(Semaphore::new(limit)));
        Self {
            extractor,
            store,
            credentials,
            config,
            slots,
        }
    }

    /// Number of downloads that may still start right now, if bounded
    pub fn available_slots(&self) -> Option<usize> {
        self.slots.as_ref().map(|s| s.available_permits())
    }

    /// Start `request` in the background and return its progress relay
    ///
    /// # Errors
    ///
    /// - [`Error::Busy`] when every download slot is taken
    /// - [`Error::Io`] when the workspace, cookie file or worker thread
    ///   cannot be created
    ///
    /// Nothing is left behind on error.
    pub async fn start(&self, request: DownloadRequest) -> Result<ProgressRelay> {
        let permit = match &self.slots {
            Some(slots) => Some(Arc::clone(slots).try_acquire_owned().map_err(|_| {
                Error::Busy {
                    limit: self.config.max_concurrent_downloads.unwrap_or_default(),
                }
            })?),
            None => None,
        };

        let workspace = Arc::new(TempWorkspace::create(&self.config.temp_dir).await?);
        let cookies = self.credentials.provision()?;
        let options = build_options(
            &request,
            workspace.path().to_path_buf(),
            cookies.as_ref().map(|c| c.path().to_path_buf()),
            &self.config,
        );

        let download_id = workspace
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .trim_start_matches(workspace::WORKSPACE_PREFIX)
            .to_string();

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let worker = DownloadWorker {
            id: download_id.clone(),
            url: request.url,
            options,
            extractor: Arc::clone(&self.extractor),
            store: self.store.clone(),
            workspace: Arc::clone(&workspace),
            cookies,
            permit,
        };
        worker.start(tx)?;

        Ok(ProgressRelay::new(download_id, rx, workspace))
    }
}

/// Translate a request into extractor options
///
/// Audio is always extracted and encoded to the requested codec. Video is
/// only converted when the requested container differs from the one the
/// extractor produces natively.
pub fn build_options(
    request: &DownloadRequest,
    output_dir: PathBuf,
    cookie_file: Option<PathBuf>,
    config: &DownloadConfig,
) -> DownloadOptions {
    let postprocess = match request.kind {
        MediaKind::Audio => PostProcessing::ExtractAudio {
            codec: request.container.clone(),
            quality_kbps: config.audio_quality,
        },
        MediaKind::Video if request.container != config.native_video_container => {
            PostProcessing::ConvertVideo {
                container: request.container.clone(),
            }
        }
        MediaKind::Video => PostProcessing::None,
    };

    DownloadOptions {
        format: request.format_id.clone(),
        output_dir,
        output_name: request.output_name.clone(),
        postprocess,
        cookie_file,
        no_playlist: true,
    }
}

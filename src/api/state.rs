//! Application state for the API server

use crate::config::Config;
use crate::credentials::CredentialProvisioner;
use crate::delivery::ArtifactStore;
use crate::download::DownloadService;
use crate::extractor::MediaExtractor;
use crate::probe::FormatProber;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Static configuration
    pub config: Arc<Config>,

    /// Backend every probe and download goes through
    pub extractor: Arc<dyn MediaExtractor>,

    /// Metadata-only probes for `/analyze`
    pub prober: FormatProber,

    /// Background downloads for `/download`
    pub downloads: DownloadService,

    /// Completed artifacts for `/download_file`
    pub store: ArtifactStore,

    /// Cookie material shared by probes and downloads
    pub credentials: CredentialProvisioner,
}

impl AppState {
    /// Wire the services for `config` around `extractor`
    pub fn new(config: Arc<Config>, extractor: Arc<dyn MediaExtractor>) -> Self {
        let credentials =
            CredentialProvisioner::new(&config.credentials, config.download.temp_dir.clone());
        let store = ArtifactStore::new(config.download.artifact_dir());

        let prober = FormatProber::new(
            Arc::clone(&extractor),
            credentials.clone(),
            config.extractor.probe_timeout,
        );
        let downloads = DownloadService::new(
            Arc::clone(&extractor),
            store.clone(),
            credentials.clone(),
            config.download.clone(),
        );

        Self {
            config,
            extractor,
            prober,
            downloads,
            store,
            credentials,
        }
    }
}

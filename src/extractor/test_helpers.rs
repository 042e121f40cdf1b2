//! Scripted extractor for deterministic pipeline tests

use super::traits::{DownloadOptions, MediaExtractor, MediaMetadata, ProbeOptions};
use crate::types::ProgressUpdate;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

/// One scripted action performed by [`FakeExtractor::download`]
#[derive(Clone)]
pub(crate) enum Step {
    /// Invoke the progress callback
    Progress(ProgressUpdate),
    /// Write `<output_name>.<ext>` into the output directory
    WriteOutput(&'static str),
    /// Return an extraction failure with this message
    Fail(&'static str),
    /// Panic with this message
    Panic(&'static str),
    /// Block until the test thread also waits on the barrier
    Gate(Arc<Barrier>),
}

/// Extractor replaying a fixed script instead of running yt-dlp
pub(crate) struct FakeExtractor {
    metadata: Option<MediaMetadata>,
    probe_error: Option<&'static str>,
    steps: Vec<Step>,
    downloads: AtomicUsize,
    last_options: Mutex<Option<DownloadOptions>>,
}

impl FakeExtractor {
    pub(crate) fn new() -> Self {
        Self {
            metadata: None,
            probe_error: None,
            steps: Vec::new(),
            downloads: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub(crate) fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn with_probe_error(mut self, message: &'static str) -> Self {
        self.probe_error = Some(message);
        self
    }

    pub(crate) fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    /// How many times `download` has been entered
    pub(crate) fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Options passed to the most recent `download`
    pub(crate) fn last_options(&self) -> Option<DownloadOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

/// Progress notification as yt-dlp would report `percent`
pub(crate) fn downloading(percent: &str) -> Step {
    Step::Progress(ProgressUpdate::Downloading(crate::types::RawProgress {
        percent: Some(percent.to_string()),
        total: Some("10.00MiB".to_string()),
        speed: Some("1.00MiB/s".to_string()),
        eta: Some("00:05".to_string()),
    }))
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn probe(&self, _url: &str, _options: &ProbeOptions) -> crate::Result<MediaMetadata> {
        if let Some(message) = self.probe_error {
            return Err(crate::Error::ExtractionFailed(message.to_string()));
        }
        Ok(self.metadata.clone().unwrap_or_default())
    }

    fn download(
        &self,
        _url: &str,
        options: &DownloadOptions,
        on_progress: &mut dyn FnMut(ProgressUpdate),
    ) -> crate::Result<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());

        for step in &self.steps {
            match step {
                Step::Progress(update) => on_progress(update.clone()),
                Step::WriteOutput(ext) => {
                    let path = options
                        .output_dir
                        .join(format!("{}.{}", options.output_name, ext));
                    std::fs::write(path, b"media bytes")?;
                }
                Step::Fail(message) => {
                    return Err(crate::Error::ExtractionFailed(message.to_string()));
                }
                Step::Panic(message) => panic!("{}", message),
                Step::Gate(barrier) => {
                    barrier.wait();
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

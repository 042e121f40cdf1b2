//! Shared helpers for integration tests: a scripted extractor and a real
//! listener running the full router.

#![allow(dead_code)]

use async_trait::async_trait;
use media_relay::extractor::{DownloadOptions, MediaMetadata, ProbeOptions, RawFormat};
use media_relay::types::{ProgressUpdate, RawProgress};
use media_relay::{AppState, Config, MediaExtractor};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Extractor that reports two progress steps and writes a small file
pub struct ScriptedExtractor {
    pub payload: &'static [u8],
}

#[async_trait]
impl MediaExtractor for ScriptedExtractor {
    async fn probe(&self, _url: &str, _options: &ProbeOptions) -> media_relay::Result<MediaMetadata> {
        Ok(MediaMetadata {
            title: Some("Scripted".to_string()),
            duration: Some(75.0),
            thumbnail: None,
            formats: vec![
                RawFormat {
                    format_id: "22".to_string(),
                    format_note: Some("720p".to_string()),
                    ext: Some("mp4".to_string()),
                    vcodec: Some("avc1".to_string()),
                    acodec: Some("mp4a".to_string()),
                    ..RawFormat::default()
                },
                RawFormat {
                    format_id: "140".to_string(),
                    ext: Some("m4a".to_string()),
                    vcodec: Some("none".to_string()),
                    acodec: Some("mp4a".to_string()),
                    abr: Some(128.0),
                    ..RawFormat::default()
                },
            ],
        })
    }

    fn download(
        &self,
        _url: &str,
        options: &DownloadOptions,
        on_progress: &mut dyn FnMut(ProgressUpdate),
    ) -> media_relay::Result<()> {
        on_progress(ProgressUpdate::Downloading(RawProgress {
            percent: Some(" 42.0%".to_string()),
            total: Some("1.00KiB".to_string()),
            speed: Some("10.00KiB/s".to_string()),
            eta: Some("00:00".to_string()),
        }));
        on_progress(ProgressUpdate::Finished);

        let path = options
            .output_dir
            .join(format!("{}.mp3", options.output_name));
        std::fs::write(path, self.payload)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A running server and the handles needed to stop it
pub struct TestServer {
    pub addr: SocketAddr,
    pub temp_dir: TempDir,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<media_relay::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger graceful shutdown and wait for the server task
    pub async fn shutdown(mut self) -> media_relay::Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.handle.await.expect("server task panicked")
    }
}

/// Serve the full router on an ephemeral port
pub async fn start_server(extractor: Arc<dyn MediaExtractor>) -> TestServer {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.download.temp_dir = temp_dir.path().to_path_buf();

    let state = AppState::new(Arc::new(config), extractor);
    state.store.init().await.expect("store init");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(media_relay::api::serve(listener, state, async {
        let _ = stop_rx.await;
    }));

    TestServer {
        addr,
        temp_dir,
        stop: Some(stop_tx),
        handle,
    }
}

/// Read a `text/event-stream` response to the end and return its JSON frames
pub async fn read_frames(response: reqwest::Response) -> Vec<serde_json::Value> {
    let text = response.text().await.expect("event stream body");
    text.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).expect("frame json"))
        .collect()
}

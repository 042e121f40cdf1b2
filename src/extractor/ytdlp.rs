//! yt-dlp backed extractor driving the external binary

use super::parser::{PROGRESS_TEMPLATE, failure_message, parse_metadata, parse_progress_line};
use super::traits::{DownloadOptions, MediaExtractor, MediaMetadata, PostProcessing, ProbeOptions};
use crate::types::ProgressUpdate;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command as StdCommand, Stdio};
use tokio::process::Command;

/// How many trailing stderr lines are kept for error reporting
const STDERR_TAIL: usize = 50;

/// Extractor executing the external `yt-dlp` binary
///
/// Probes run through `tokio::process` and are killed when the caller stops
/// waiting. Downloads run through `std::process` on the caller's (worker)
/// thread; progress is read line by line from stdout.
pub struct YtDlpExtractor {
    binary_path: PathBuf,
}

impl YtDlpExtractor {
    /// Create an extractor with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Returns `None` when the binary cannot be found.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Location of the binary this extractor runs
    pub fn binary_path(&self) -> &std::path::Path {
        &self.binary_path
    }
}

fn probe_args(url: &str, options: &ProbeOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--dump-single-json".into(),
        "--no-playlist".into(),
        "--no-warnings".into(),
    ];
    if let Some(cookies) = &options.cookie_file {
        args.push("--cookies".into());
        args.push(cookies.into());
    }
    args.push("--".into());
    args.push(url.into());
    args
}

fn download_args(url: &str, options: &DownloadOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--newline".into(),
        "--no-colors".into(),
        "--no-mtime".into(),
        "--progress-template".into(),
        PROGRESS_TEMPLATE.into(),
        "-f".into(),
        options.format.as_str().into(),
        "-o".into(),
        options.output_template().into(),
    ];

    if options.no_playlist {
        args.push("--no-playlist".into());
    }

    match &options.postprocess {
        PostProcessing::None => {}
        PostProcessing::ExtractAudio {
            codec,
            quality_kbps,
        } => {
            args.push("-x".into());
            args.push("--audio-format".into());
            args.push(codec.as_str().into());
            args.push("--audio-quality".into());
            args.push(format!("{}K", quality_kbps).into());
        }
        PostProcessing::ConvertVideo { container } => {
            args.push("--recode-video".into());
            args.push(container.as_str().into());
        }
    }

    if let Some(cookies) = &options.cookie_file {
        args.push("--cookies".into());
        args.push(cookies.into());
    }

    args.push("--".into());
    args.push(url.into());
    args
}

/// Read `reader` line by line, tolerating invalid UTF-8
fn for_each_line<R: Read>(reader: R, mut f: impl FnMut(&str)) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => f(&String::from_utf8_lossy(&buf)),
            Err(e) => {
                tracing::debug!(error = %e, "Stopped reading yt-dlp output");
                break;
            }
        }
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn probe(&self, url: &str, options: &ProbeOptions) -> crate::Result<MediaMetadata> {
        let output = Command::new(&self.binary_path)
            .args(probe_args(url, options))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(crate::Error::ExtractionFailed(failure_message(
                stderr.lines(),
                &format!("yt-dlp exited with {}", output.status),
            )));
        }

        parse_metadata(&output.stdout)
    }

    fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        on_progress: &mut dyn FnMut(ProgressUpdate),
    ) -> crate::Result<()> {
        let mut child = StdCommand::new(&self.binary_path)
            .args(download_args(url, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        // stderr must be drained concurrently or a chatty child blocks on a full pipe
        let stderr_reader = child.stderr.take().map(|stderr| {
            std::thread::spawn(move || {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL);
                for_each_line(stderr, |line| {
                    tracing::debug!(line = line.trim_end(), "yt-dlp stderr");
                    if tail.len() == STDERR_TAIL {
                        tail.pop_front();
                    }
                    tail.push_back(line.trim_end().to_string());
                });
                tail
            })
        });

        if let Some(stdout) = child.stdout.take() {
            for_each_line(stdout, |line| {
                if let Some(update) = parse_progress_line(line) {
                    on_progress(update);
                } else {
                    tracing::trace!(line = line.trim_end(), "yt-dlp stdout");
                }
            });
        }

        let status = child.wait()?;
        let tail = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(crate::Error::ExtractionFailed(failure_message(
                tail.iter().map(String::as_str),
                &format!("yt-dlp exited with {}", status),
            )))
        }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

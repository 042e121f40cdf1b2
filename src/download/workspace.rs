//! Per-request temporary directories

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name prefix of every workspace directory below the temp area
pub(crate) const WORKSPACE_PREFIX: &str = "ws-";

/// Name prefix of cookie files written by the credential provisioner
const COOKIE_PREFIX: &str = "cookies-";

/// Partial-download suffixes the extractor may leave behind
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// A directory exclusively owned by one download request
///
/// Removal is idempotent: both the worker (when it finishes) and the
/// response teardown call [`TempWorkspace::remove`], and `Drop` does too.
#[derive(Debug)]
pub struct TempWorkspace {
    path: PathBuf,
}

impl TempWorkspace {
    /// Create `<temp_dir>/ws-<uuid>`
    pub async fn create(temp_dir: &Path) -> Result<Self> {
        let path = temp_dir.join(format!(
            "{}{}",
            WORKSPACE_PREFIX,
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::create_dir_all(&path).await?;
        tracing::debug!(path = ?path, "Created workspace");
        Ok(Self { path })
    }

    /// Directory the extractor writes into
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the directory and everything in it; a no-op once gone
    pub fn remove(&self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(path = ?self.path, "Removed workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = ?self.path, error = %e, "Failed to remove workspace"),
        }
    }

    /// First finished file whose name begins with `output_name`
    ///
    /// Entries are compared in name order so the choice is deterministic;
    /// partial-download leftovers are skipped.
    pub fn find_output(&self, output_name: &str) -> Option<PathBuf> {
        let entries = match std::fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Cannot scan workspace");
                return None;
            }
        };

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let partial = PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s));
                (name.starts_with(output_name) && !partial).then(|| entry.path())
            })
            .collect();

        candidates.sort();
        candidates.into_iter().next()
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Response-side handle that removes the workspace when the response ends
///
/// Held by the progress stream; dropped when the stream finishes or the
/// client disconnects, whichever comes first.
#[derive(Debug)]
pub struct WorkspaceGuard(Arc<TempWorkspace>);

impl WorkspaceGuard {
    /// Guard `workspace` for the lifetime of a response
    pub fn new(workspace: Arc<TempWorkspace>) -> Self {
        Self(workspace)
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        self.0.remove();
    }
}

/// Remove workspaces and cookie files left behind by a previous run
///
/// Returns the number of entries deleted.
pub async fn purge_stale_workspaces(temp_dir: &Path) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(temp_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut purged = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        let result = if name.starts_with(WORKSPACE_PREFIX) && entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(entry.path()).await
        } else if name.starts_with(COOKIE_PREFIX) {
            tokio::fs::remove_file(entry.path()).await
        } else {
            continue;
        };

        match result {
            Ok(()) => purged += 1,
            Err(e) => tracing::warn!(path = ?entry.path(), error = %e, "Failed to purge stale entry"),
        }
    }

    if purged > 0 {
        tracing::info!(purged, temp_dir = ?temp_dir, "Purged stale workspaces");
    }
    Ok(purged)
}

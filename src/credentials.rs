//! Short-lived cookie files for the extractor
//!
//! The extractor only accepts cookies as a file path, so the configured cookie
//! material is written to a private temporary file for the duration of one
//! probe or download. The file disappears when the returned [`CookieFile`] is
//! dropped.

use crate::config::CredentialConfig;
use crate::error::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Supplies per-request cookie files from injected configuration
#[derive(Clone, Debug)]
pub struct CredentialProvisioner {
    cookies: Option<String>,
    dir: PathBuf,
}

impl CredentialProvisioner {
    /// Create a provisioner writing its files below `dir`
    pub fn new(config: &CredentialConfig, dir: impl Into<PathBuf>) -> Self {
        Self {
            cookies: config
                .cookies
                .as_ref()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            dir: dir.into(),
        }
    }

    /// Whether any credential material is configured
    pub fn is_configured(&self) -> bool {
        self.cookies.is_some()
    }

    /// Write the cookie material to a fresh temporary file.
    ///
    /// Returns `Ok(None)` when no cookies are configured.
    pub fn provision(&self) -> Result<Option<CookieFile>> {
        let Some(cookies) = &self.cookies else {
            return Ok(None);
        };

        std::fs::create_dir_all(&self.dir)?;

        let mut file = tempfile::Builder::new()
            .prefix("cookies-")
            .suffix(".txt")
            .tempfile_in(&self.dir)?;
        file.write_all(cookies.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;

        tracing::debug!(path = ?file.path(), "Wrote temporary cookie file");
        Ok(Some(CookieFile { file }))
    }
}

/// A cookie file that is deleted when dropped
#[derive(Debug)]
pub struct CookieFile {
    file: NamedTempFile,
}

impl CookieFile {
    /// Location to hand to the extractor
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for CookieFile {
    fn drop(&mut self) {
        tracing::debug!(path = ?self.file.path(), "Deleting temporary cookie file");
    }
}

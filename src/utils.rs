//! Utility functions for string cleanup and path manipulation

use crate::error::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Longest file stem accepted for an artifact
const MAX_OUTPUT_NAME_LEN: usize = 120;

// Constant pattern, exercised by the tests below
#[allow(clippy::expect_used)]
fn ansi_pattern() -> &'static Regex {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    ANSI.get_or_init(|| Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").expect("valid ANSI pattern"))
}

/// Remove ANSI terminal control sequences (colours, cursor moves) from a string
///
/// # Examples
///
/// ```
/// use media_relay::utils::strip_ansi;
///
/// assert_eq!(strip_ansi("\x1b[0;94m 45.2%\x1b[0m"), " 45.2%");
/// ```
#[must_use]
pub fn strip_ansi(input: &str) -> String {
    ansi_pattern().replace_all(input, "").into_owned()
}

/// Turn a caller-supplied file name into a safe artifact stem
///
/// Path separators, template metacharacters (`%`) and control characters are
/// replaced with `_`; leading dots and surrounding whitespace are dropped so
/// the result can never name a hidden file or escape its directory. Returns
/// `None` when nothing usable remains.
///
/// # Examples
///
/// ```
/// use media_relay::utils::sanitize_output_name;
///
/// assert_eq!(sanitize_output_name("My Song").as_deref(), Some("My Song"));
/// assert_eq!(sanitize_output_name("../etc/passwd").as_deref(), Some("etc_passwd"));
/// assert_eq!(sanitize_output_name("..."), None);
/// ```
#[must_use]
pub fn sanitize_output_name(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '%' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim_start_matches(['.', '_']).trim();
    if cleaned.is_empty() {
        return None;
    }

    Some(cleaned.chars().take(MAX_OUTPUT_NAME_LEN).collect())
}

/// Check that a retrieval handle is a single, visible path component
///
/// Rejects empty names, names starting with `.`, and anything containing a
/// path separator, so a handle can only ever resolve inside the artifact
/// directory.
#[must_use]
pub fn is_valid_handle(handle: &str) -> bool {
    !handle.is_empty()
        && !handle.starts_with('.')
        && !handle.contains(['/', '\\', '\0'])
        && Path::new(handle).file_name().and_then(|n| n.to_str()) == Some(handle)
}

/// Get a path that does not collide with an existing file
///
/// If `path` is free it is returned unchanged; otherwise ` (1)`, ` (2)`, ...
/// is appended to the stem until a free name is found.
///
/// # Examples
///
/// ```
/// use media_relay::utils::get_unique_path;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/definitely-not-here/song.mp3");
/// assert_eq!(get_unique_path(path).unwrap(), path);
/// ```
pub fn get_unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::BadRequest(format!("cannot derive a file stem from {:?}", path)))?;

    let extension = path.extension().and_then(|e| e.to_str());

    let parent = path
        .parent()
        .ok_or_else(|| Error::BadRequest(format!("{:?} has no parent directory", path)))?;

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let new_name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let new_path = parent.join(new_name);
        if !new_path.exists() {
            return Ok(new_path);
        }
    }

    Err(Error::Io(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!(
            "could not find a unique name after {} attempts",
            MAX_RENAME_ATTEMPTS
        ),
    )))
}

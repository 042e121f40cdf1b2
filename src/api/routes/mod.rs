//! Route handlers for the REST API.
//!
//! Handlers are organized by domain:
//! - [`media`] - Format analysis
//! - [`downloads`] - Download progress streams and one-time file retrieval
//! - [`system`] - Health check and OpenAPI specification

mod downloads;
mod media;
mod system;

pub use downloads::*;
pub use media::*;
pub use system::*;

use crate::error::Error;
use crate::types::{DownloadRequest, MediaKind};
use crate::utils::sanitize_output_name;
use serde::Deserialize;
use utoipa::IntoParams;

/// Longest accepted target container / codec name
const MAX_CONTAINER_LEN: usize = 10;

/// Query parameters for `GET /api/analyze`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyzeQuery {
    /// Media URL to probe
    pub url: Option<String>,
}

/// Query parameters for `GET /api/download`
///
/// Everything is optional at the extractor level so a missing field produces
/// our own 400 body instead of axum's plain-text rejection.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Media URL to download
    pub url: Option<String>,

    /// `audio` or `video`
    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// Format handle returned by `/api/analyze`, e.g. `140`
    pub quality: Option<String>,

    /// Target container or codec, e.g. `mp3` or `mp4`
    pub format: Option<String>,

    /// Desired file name without extension (random when omitted)
    pub filename: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TryFrom<DownloadQuery> for DownloadRequest {
    type Error = Error;

    fn try_from(query: DownloadQuery) -> Result<Self, Self::Error> {
        let (Some(url), Some(kind), Some(format_id), Some(container)) = (
            required(query.url),
            required(query.kind),
            required(query.quality),
            required(query.format),
        ) else {
            return Err(Error::BadRequest("Missing required parameters".to_string()));
        };

        let kind: MediaKind = kind.parse()?;

        match url::Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                return Err(Error::BadRequest(
                    "url must be an absolute http(s) URL".to_string(),
                ));
            }
        }

        let container = container.to_ascii_lowercase();
        if container.len() > MAX_CONTAINER_LEN
            || !container.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::BadRequest(format!(
                "format must be a container name such as 'mp3' or 'mp4', got '{}'",
                container
            )));
        }

        if format_id.chars().any(char::is_control) {
            return Err(Error::BadRequest("quality contains invalid characters".to_string()));
        }

        let output_name = query
            .filename
            .as_deref()
            .and_then(sanitize_output_name)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(DownloadRequest {
            url,
            kind,
            format_id,
            container,
            output_name,
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> DownloadQuery {
        DownloadQuery {
            url: Some("https://example.com/watch?v=1".to_string()),
            kind: Some("audio".to_string()),
            quality: Some("140".to_string()),
            format: Some("mp3".to_string()),
            filename: Some("My Song".to_string()),
        }
    }

    fn rejection(query: DownloadQuery) -> String {
        match DownloadRequest::try_from(query).unwrap_err() {
            Error::BadRequest(message) => message,
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn complete_query_becomes_request() {
        let request = DownloadRequest::try_from(query()).unwrap();

        assert_eq!(request.kind, MediaKind::Audio);
        assert_eq!(request.container, "mp3");
        assert_eq!(request.format_id, "140");
        assert_eq!(request.output_name, "My Song");
    }

    #[test]
    fn quality_carries_format_id_and_format_carries_container() {
        let request = DownloadRequest::try_from(DownloadQuery {
            url: Some("https://example.com/v".to_string()),
            kind: Some("video".to_string()),
            quality: Some("137".to_string()),
            format: Some("mkv".to_string()),
            filename: None,
        })
        .unwrap();

        assert_eq!(request.format_id, "137");
        assert_eq!(request.container, "mkv");
    }

    #[test]
    fn each_missing_field_is_rejected() {
        for strip in 0..4 {
            let mut q = query();
            match strip {
                0 => q.url = None,
                1 => q.kind = None,
                2 => q.quality = Some("  ".to_string()),
                _ => q.format = None,
            }
            assert_eq!(rejection(q), "Missing required parameters");
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut q = query();
        q.kind = Some("podcast".to_string());
        assert!(rejection(q).contains("podcast"));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let mut q = query();
        q.url = Some("file:///etc/passwd".to_string());
        assert!(rejection(q).contains("http"));

        let mut q = query();
        q.url = Some("--exec=rm".to_string());
        assert!(rejection(q).contains("http"));
    }

    #[test]
    fn container_must_be_short_alphanumeric() {
        let mut q = query();
        q.format = Some("mp3;rm".to_string());
        assert!(rejection(q).contains("container"));

        let mut q = query();
        q.format = Some("MKV".to_string());
        assert_eq!(DownloadRequest::try_from(q).unwrap().container, "mkv");
    }

    #[test]
    fn missing_or_unusable_filename_gets_random_name() {
        let mut q = query();
        q.filename = None;
        let first = DownloadRequest::try_from(q).unwrap().output_name;

        let mut q = query();
        q.filename = Some("...".to_string());
        let second = DownloadRequest::try_from(q).unwrap().output_name;

        assert!(uuid::Uuid::parse_str(&first).is_ok());
        assert!(uuid::Uuid::parse_str(&second).is_ok());
        assert_ne!(first, second);
    }

    #[test]
    fn filename_is_sanitized() {
        let mut q = query();
        q.filename = Some("../../evil".to_string());
        assert_eq!(DownloadRequest::try_from(q).unwrap().output_name, "evil");
    }
}

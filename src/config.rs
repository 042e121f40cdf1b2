//! Configuration types for media-relay

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Environment variable holding the bind address (e.g. `0.0.0.0:5000`)
pub const ENV_BIND: &str = "MEDIA_RELAY_BIND";
/// Environment variable overriding the shared temporary area
pub const ENV_TEMP_DIR: &str = "MEDIA_RELAY_TEMP_DIR";
/// Environment variable bounding concurrent downloads (unset = unbounded)
pub const ENV_MAX_CONCURRENT: &str = "MEDIA_RELAY_MAX_CONCURRENT";
/// Environment variable with an explicit yt-dlp binary path
pub const ENV_YTDLP: &str = "MEDIA_RELAY_YTDLP";
/// Environment variable carrying Netscape-format cookies for the extractor
pub const ENV_COOKIES: &str = "YT_COOKIES";

/// Main configuration for the relay
///
/// Fields are grouped into sub-configs:
/// - [`server`](ApiConfig) - bind address, CORS, Swagger UI
/// - [`download`](DownloadConfig) - temp area, admission control, artifact lifetime
/// - [`extractor`](ExtractorConfig) - yt-dlp binary discovery and timeouts
/// - [`credentials`](CredentialConfig) - cookie material handed to the extractor
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ApiConfig,

    /// Download pipeline settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// External extractor settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Credential material
    #[serde(default)]
    pub credentials: CredentialConfig,
}

impl Config {
    /// Build a configuration from the process environment.
    ///
    /// Unset variables keep their defaults. See the `ENV_*` constants for the
    /// recognised names.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// [`Config::from_env`] delegates here; tests pass a closure over a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(bind) = lookup(ENV_BIND) {
            config.server.bind_address = bind.trim().parse().map_err(|e| Error::Config {
                message: format!("invalid bind address '{}': {}", bind, e),
                key: Some(ENV_BIND.to_string()),
            })?;
        }

        if let Some(dir) = lookup(ENV_TEMP_DIR)
            && !dir.trim().is_empty()
        {
            config.download.temp_dir = PathBuf::from(dir.trim());
        }

        if let Some(limit) = lookup(ENV_MAX_CONCURRENT) {
            let limit: usize = limit.trim().parse().map_err(|e| Error::Config {
                message: format!("invalid concurrency limit '{}': {}", limit, e),
                key: Some(ENV_MAX_CONCURRENT.to_string()),
            })?;
            config.download.max_concurrent_downloads = Some(limit);
        }

        if let Some(path) = lookup(ENV_YTDLP)
            && !path.trim().is_empty()
        {
            config.extractor.ytdlp_path = Some(PathBuf::from(path.trim()));
        }

        if let Some(cookies) = lookup(ENV_COOKIES)
            && !cookies.trim().is_empty()
        {
            config.credentials.cookies = Some(cookies);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == Some(0) {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }

        if self.download.native_video_container.trim().is_empty() {
            return Err(Error::Config {
                message: "native_video_container must not be empty".to_string(),
                key: Some("native_video_container".to_string()),
            });
        }

        if self.download.audio_quality == 0 {
            return Err(Error::Config {
                message: "audio_quality must be a positive bitrate in kbit/s".to_string(),
                key: Some("audio_quality".to_string()),
            });
        }

        Ok(())
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:5000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Download pipeline configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Shared temporary area holding per-request workspaces and adopted artifacts
    /// (default: `<system temp>/media-relay`)
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Maximum number of downloads running at once (None = one thread per request)
    #[serde(default)]
    pub max_concurrent_downloads: Option<usize>,

    /// Bitrate in kbit/s used when converting audio (default: 192)
    #[serde(default = "default_audio_quality")]
    pub audio_quality: u32,

    /// Container the extractor produces natively for video; other containers are
    /// converted after download (default: "mp4")
    #[serde(default = "default_native_video_container")]
    pub native_video_container: String,

    /// How long an unretrieved artifact is kept before the sweeper deletes it
    /// (default: 1 hour)
    #[serde(default = "default_artifact_ttl", with = "duration_serde")]
    pub artifact_ttl: Duration,

    /// How often the sweeper runs (default: 60 seconds)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub sweep_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            max_concurrent_downloads: None,
            audio_quality: default_audio_quality(),
            native_video_container: default_native_video_container(),
            artifact_ttl: default_artifact_ttl(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl DownloadConfig {
    /// Directory holding adopted artifacts awaiting retrieval
    pub fn artifact_dir(&self) -> PathBuf {
        self.temp_dir.join("artifacts")
    }
}

/// External extractor (yt-dlp) configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Upper bound on a metadata probe (default: 120 seconds)
    #[serde(default = "default_probe_timeout", with = "duration_serde")]
    pub probe_timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
            probe_timeout: default_probe_timeout(),
        }
    }
}

/// Credential material supplied to the extractor
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Netscape cookie-file contents; written to a short-lived file per request
    #[serde(default, skip_serializing)]
    pub cookies: Option<String>,
}

impl std::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("cookies", &self.cookies.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("media-relay")
}

fn default_audio_quality() -> u32 {
    192
}

fn default_native_video_container() -> String {
    "mp4".to_string()
}

fn default_artifact_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(120)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

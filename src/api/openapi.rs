//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-relay REST API
//! using utoipa for compile-time document generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-relay REST API
///
/// The document is served at:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-relay REST API",
        version = "0.1.0",
        description = "Probe media URLs for available formats, download them through yt-dlp with live progress, and fetch the result once",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        crate::api::routes::analyze,
        crate::api::routes::download,
        crate::api::routes::download_file,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(
        schemas(
            crate::types::MediaInfo,
            crate::types::VideoFormat,
            crate::types::AudioFormat,
            crate::types::MediaKind,
            crate::types::WireEvent,
            crate::types::WireStatus,
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "media", description = "Format analysis"),
        (name = "downloads", description = "Progress streams and file retrieval"),
        (name = "system", description = "Health and API documentation")
    )
)]
pub struct ApiDoc;

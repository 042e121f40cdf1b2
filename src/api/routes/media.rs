//! Format analysis handler.

use super::AnalyzeQuery;
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::MediaInfo;
use axum::{
    Json,
    extract::{Query, State},
};

/// GET /api/analyze - Probe a URL and list its downloadable formats
#[utoipa::path(
    get,
    path = "/api/analyze",
    tag = "media",
    params(AnalyzeQuery),
    responses(
        (status = 200, description = "Available formats, best first", body = MediaInfo),
        (status = 400, description = "URL parameter missing", body = crate::error::ApiError),
        (status = 500, description = "Extractor failed", body = crate::error::ApiError)
    )
)]
pub async fn analyze(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<Json<MediaInfo>> {
    let url = query
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::BadRequest("URL parameter is required".to_string()))?;

    let info = state.prober.probe(&url).await?;
    Ok(Json(info))
}

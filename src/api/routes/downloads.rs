//! Download handlers: progress stream and one-time retrieval.

use super::DownloadQuery;
use crate::api::AppState;
use crate::error::Result;
use crate::types::DownloadRequest;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use std::convert::Infallible;
use tokio_stream::StreamExt;

/// GET /api/download - Start a download and stream its progress
///
/// Each event's `data` is one JSON [`WireEvent`](crate::types::WireEvent).
/// The stream ends after a `complete` or `error` frame; closing it early
/// abandons the download.
#[utoipa::path(
    get,
    path = "/api/download",
    tag = "downloads",
    params(DownloadQuery),
    responses(
        (status = 200, description = "Progress frames (text/event-stream)", content_type = "text/event-stream", body = crate::types::WireEvent),
        (status = 400, description = "Missing or invalid parameters", body = crate::error::ApiError),
        (status = 503, description = "All download slots are busy", body = crate::error::ApiError)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = std::result::Result<SseEvent, Infallible>>>> {
    let request = DownloadRequest::try_from(query)?;
    let relay = state.downloads.start(request).await?;
    let download_id = relay.download_id().to_string();

    let stream = relay
        .into_stream()
        .filter_map(move |frame| match serde_json::to_string(&frame) {
            Ok(json) => Some(Ok(SseEvent::default().data(json))),
            Err(e) => {
                tracing::warn!(download_id = %download_id, error = %e, "Failed to serialize progress frame");
                None
            }
        });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// GET /api/download_file/{filename} - Retrieve a finished file once
#[utoipa::path(
    get,
    path = "/api/download_file/{filename}",
    tag = "downloads",
    params(
        ("filename" = String, Path, description = "Handle from the `complete` frame's file_url")
    ),
    responses(
        (status = 200, description = "File contents as an attachment", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown or already retrieved", body = crate::error::ApiError)
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse> {
    let delivered = state.store.open(&filename).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (header::CONTENT_LENGTH, delivered.len.to_string()),
        (header::CONTENT_DISPOSITION, delivered.content_disposition()),
    ];

    Ok((headers, Body::from_stream(delivered.body)))
}

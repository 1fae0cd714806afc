//! Download endpoint: the last N minutes as one MP3 attachment.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Deserialize;

use crate::buffer::selector;
use crate::constants::DEFAULT_DOWNLOAD_MINUTES;
use crate::error::AppError;
use crate::ffmpeg::concat;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    minutes: Option<i64>,
}

pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let minutes = query.minutes.unwrap_or(DEFAULT_DOWNLOAD_MINUTES as i64);
    let max = state.config.buffer.max_download_minutes as i64;
    if minutes < 1 || minutes > max {
        return Err(AppError::InvalidParam(format!(
            "minutes must be between 1 and {}",
            max
        )));
    }

    let segments = selector::select(
        &state.config.buffer_dir(),
        minutes,
        state.config.buffer.segment_seconds,
    )?;
    if segments.is_empty() {
        return Err(AppError::BufferNotReady);
    }

    log::info!(
        "Download requested: {} minutes, {} segments selected",
        minutes,
        segments.len()
    );

    let stream = concat::stream(&state.config.encoder.ffmpeg_path, &segments)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=last-{}-minutes.mp3", minutes),
        )
        // No content-length because the output is streamed
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Ffmpeg(format!("Failed to build response: {}", e)))
}

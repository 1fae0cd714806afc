//! Introspection endpoint for diagnosing buffer health.
//!
//! Returns the listing the selector would hand to the concatenator for
//! a given window. Not for production consumption.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::UNIX_EPOCH;

use crate::buffer::selector;
use crate::error::AppError;
use crate::ffmpeg::utils::{estimate_duration_secs, parse_bitrate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DebugQuery {
    minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SegmentInfo {
    pub name: String,
    pub size_bytes: u64,
    pub mtime: f64,
    pub path: String,
    pub estimated_duration_secs: f64,
}

#[derive(Debug, Serialize)]
pub struct SegmentListing {
    pub count: usize,
    pub total_bytes: u64,
    pub files: Vec<SegmentInfo>,
}

pub async fn segments(
    State(state): State<AppState>,
    Query(query): Query<DebugQuery>,
) -> Result<Json<SegmentListing>, AppError> {
    let minutes = query.minutes.unwrap_or(1);
    if minutes < 1 {
        return Err(AppError::InvalidParam("minutes must be at least 1".to_string()));
    }

    let selected = selector::select(
        &state.config.buffer_dir(),
        minutes,
        state.config.buffer.segment_seconds,
    )?;

    let bitrate_bps = parse_bitrate(&state.config.encoder.audio_bitrate);
    let files: Vec<SegmentInfo> = selected
        .iter()
        .map(|s| SegmentInfo {
            name: s.name.clone(),
            size_bytes: s.size_bytes,
            mtime: s
                .modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
            path: s.path.to_string_lossy().to_string(),
            estimated_duration_secs: estimate_duration_secs(
                s.size_bytes,
                bitrate_bps,
                state.config.buffer.segment_seconds,
            ),
        })
        .collect();

    Ok(Json(SegmentListing {
        count: files.len(),
        total_bytes: files.iter().map(|f| f.size_bytes).sum(),
        files,
    }))
}

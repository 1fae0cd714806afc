use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::io;

use crate::constants::DIAGNOSTIC_TAIL_LIMIT;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    #[error("FFmpeg Error: {0}")]
    Ffmpeg(String),

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Buffer not ready yet; please try again shortly")]
    BufferNotReady,

    #[error("No concatenable segments remain")]
    NothingToStream,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidParam(_) => StatusCode::BAD_REQUEST,
            AppError::BufferNotReady | AppError::NothingToStream => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut detail = self.to_string();
        truncate_detail(&mut detail, DIAGNOSTIC_TAIL_LIMIT);
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

/// Bound the detail string, backing the cut off to a char boundary.
/// Error text can carry multi-byte chars (localized IO messages,
/// FFmpeg stderr excerpts).
fn truncate_detail(detail: &mut String, limit: usize) {
    if detail.len() <= limit {
        return;
    }
    let mut end = limit;
    while !detail.is_char_boundary(end) {
        end -= 1;
    }
    detail.truncate(end);
}

// Helper to convert strings to AppError easily
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Ffmpeg(s)
    }
}

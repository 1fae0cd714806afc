//! HTTP surface.
//!
//! # Architecture
//! - `/` - liveness check plus encoder status
//! - `/live` - pass-through relay of the upstream stream
//! - `/download` - last N minutes of buffer as one MP3
//! - `/debug/segments` - buffer introspection
//!
//! Handlers return `AppError` and let its `IntoResponse` impl map to
//! status codes; only the streaming endpoints build responses by hand.

pub mod debug;
pub mod download;
pub mod live;

use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/", get(root))
        .route("/live", get(live::live))
        .route("/download", get(download::download))
        .route("/debug/segments", get(debug::segments))
        .layer(cors)
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "encoder_running": state.supervisor.is_running(),
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
}

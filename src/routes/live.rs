//! Live pass-through relay.
//!
//! Forwards the upstream stream to the client without touching the
//! buffer. Upstream failures are retried after a fixed backoff without
//! ending the client response; only a clean upstream EOF ends it.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io;
use std::time::Duration;

use crate::constants::RELAY_RETRY_DELAY_SECS;
use crate::state::AppState;

pub async fn live(State(state): State<AppState>) -> Response {
    let stream = relay_stream(state.http.clone(), state.config.stream.url.clone());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            log::error!("Failed to build live response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

fn relay_stream(
    client: reqwest::Client,
    url: String,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
    async_stream::stream! {
        loop {
            let response = client
                .get(&url)
                .header("Icy-MetaData", "1")
                .send()
                .await
                .and_then(|r| r.error_for_status());

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    log::warn!(
                        "Upstream connect failed: {}; retrying in {}s",
                        e,
                        RELAY_RETRY_DELAY_SECS
                    );
                    tokio::time::sleep(Duration::from_secs(RELAY_RETRY_DELAY_SECS)).await;
                    continue;
                }
            };

            log::info!("Connected to upstream {}", url);
            let mut body = response.bytes_stream();
            let mut failed = false;

            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(c) if !c.is_empty() => yield Ok(c),
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!(
                            "Upstream read error: {}; reconnecting in {}s",
                            e,
                            RELAY_RETRY_DELAY_SECS
                        );
                        failed = true;
                        break;
                    }
                }
            }

            if !failed {
                // Clean upstream EOF: end the client response too
                log::info!("Upstream stream ended");
                break;
            }

            tokio::time::sleep(Duration::from_secs(RELAY_RETRY_DELAY_SECS)).await;
        }
    }
}

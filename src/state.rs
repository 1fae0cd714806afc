use std::sync::Arc;

use crate::config::AppConfig;
use crate::ffmpeg::supervisor::EncoderSupervisor;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Shared upstream client for the live relay
    pub http: reqwest::Client,
    pub supervisor: Arc<EncoderSupervisor>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let supervisor = Arc::new(EncoderSupervisor::new(&config));
        Self {
            config,
            http: reqwest::Client::new(),
            supervisor,
        }
    }
}

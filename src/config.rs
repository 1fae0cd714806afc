use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_AUDIO_BITRATE, DEFAULT_BUFFER_MINUTES, DEFAULT_CLEANUP_MARGIN_MINUTES,
    DEFAULT_MAX_DOWNLOAD_MINUTES, DEFAULT_SEGMENT_SECONDS,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StreamConfig {
    /// Upstream live stream URL (relayed to clients and used for ingest)
    #[serde(default = "default_stream_url")]
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BufferConfig {
    /// Where the rolling MP3 segments live
    #[serde(default = "default_buffer_dir")]
    pub dir: String,
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,
    /// Nominal rewind window served to clients
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: u32,
    /// Extra retention so in-flight downloads never race the sweeper
    #[serde(default = "default_cleanup_margin_minutes")]
    pub cleanup_margin_minutes: u32,
    #[serde(default = "default_max_download_minutes")]
    pub max_download_minutes: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncoderConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_stream_url() -> String {
    "http://127.0.0.1:8888/live".to_string()
}

fn default_buffer_dir() -> String {
    if let Some(mut path) = dirs::data_local_dir() {
        path.push("airshift");
        path.push("segments");
        return path.to_string_lossy().to_string();
    }
    "storage/segments".to_string()
}

fn default_segment_seconds() -> u32 {
    DEFAULT_SEGMENT_SECONDS
}

fn default_buffer_minutes() -> u32 {
    DEFAULT_BUFFER_MINUTES
}

fn default_cleanup_margin_minutes() -> u32 {
    DEFAULT_CLEANUP_MARGIN_MINUTES
}

fn default_max_download_minutes() -> u32 {
    DEFAULT_MAX_DOWNLOAD_MINUTES
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_stream_url(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            dir: default_buffer_dir(),
            segment_seconds: default_segment_seconds(),
            buffer_minutes: default_buffer_minutes(),
            cleanup_margin_minutes: default_cleanup_margin_minutes(),
            max_download_minutes: default_max_download_minutes(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            buffer: BufferConfig::default(),
            encoder: EncoderConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config.toml (writing defaults back if missing), then apply
    /// environment overrides on top.
    pub fn load() -> Self {
        let config_path = config_path();

        let mut config = None;
        if let Some(path) = &config_path {
            if path.exists() {
                match fs::read_to_string(path) {
                    Ok(content) => match toml::from_str(&content) {
                        Ok(parsed) => config = Some(parsed),
                        Err(e) => log::error!("Failed to parse config file: {}", e),
                    },
                    Err(e) => log::error!("Failed to read config file: {}", e),
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            let default_config = Self::default();
            // Save the defaults so the user has a file to edit
            if let Some(path) = &config_path {
                let _ = default_config.save_to_path(path);
            }
            default_config
        });

        config.apply_env_overrides();
        config
    }

    pub fn buffer_dir(&self) -> PathBuf {
        PathBuf::from(&self.buffer.dir)
    }

    /// Retention window in minutes: the served window plus the sweep margin.
    pub fn retention_minutes(&self) -> u32 {
        self.buffer.buffer_minutes + self.buffer.cleanup_margin_minutes
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("STREAM_URL") {
            self.stream.url = v;
        }
        if let Ok(v) = env::var("BUFFER_DIR") {
            self.buffer.dir = v;
        }
        if let Ok(v) = env::var("SEGMENT_SECONDS") {
            match v.parse() {
                Ok(n) => self.buffer.segment_seconds = n,
                Err(_) => log::warn!("Ignoring invalid SEGMENT_SECONDS: {}", v),
            }
        }
        if let Ok(v) = env::var("BUFFER_MINUTES") {
            match v.parse() {
                Ok(n) => self.buffer.buffer_minutes = n,
                Err(_) => log::warn!("Ignoring invalid BUFFER_MINUTES: {}", v),
            }
        }
        if let Ok(v) = env::var("CLEANUP_MARGIN_MINUTES") {
            match v.parse() {
                Ok(n) => self.buffer.cleanup_margin_minutes = n,
                Err(_) => log::warn!("Ignoring invalid CLEANUP_MARGIN_MINUTES: {}", v),
            }
        }
        if let Ok(v) = env::var("MAX_DOWNLOAD_MINUTES") {
            match v.parse() {
                Ok(n) => self.buffer.max_download_minutes = n,
                Err(_) => log::warn!("Ignoring invalid MAX_DOWNLOAD_MINUTES: {}", v),
            }
        }
        if let Ok(v) = env::var("FFMPEG_PATH") {
            self.encoder.ffmpeg_path = v;
        }
        if let Ok(v) = env::var("AUDIO_BITRATE") {
            self.encoder.audio_bitrate = v;
        }
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            match v.parse() {
                Ok(n) => self.server.port = n,
                Err(_) => log::warn!("Ignoring invalid PORT: {}", v),
            }
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
    }

    fn save_to_path(&self, path: &PathBuf) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        fs::write(path, content).map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("AIRSHIFT_CONFIG") {
        return Some(PathBuf::from(p));
    }
    dirs::config_dir().map(|p| p.join("airshift").join("config.toml"))
}

pub mod buffer;
pub mod config;
pub mod constants;
pub mod error;
pub mod ffmpeg;
pub mod routes;
pub mod state;

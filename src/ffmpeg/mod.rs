//! FFmpeg Module
//!
//! All interaction with the external FFmpeg binary lives here. FFmpeg is
//! treated as an opaque CLI collaborator: one long-lived process turns
//! the upstream stream into rolling segments, and one short-lived process
//! per download request concatenates segments back into a single stream.
//!
//! # Architecture
//!
//! * `supervisor`: lifecycle of the segmenter process; restarts it on
//!   exit or crash with backoff.
//! * `concat`: per-request concat demuxer invocation with streamed
//!   output and guaranteed cleanup.
//! * `commands`: builder for FFmpeg CLI argument vectors.
//! * `monitor`: parses FFmpeg stderr (progress lines, diagnostic tail).
//! * `utils`: shared helpers (bitrate parsing, duration estimation).

pub mod commands;
pub mod concat;
pub mod monitor;
pub mod supervisor;
pub mod utils;

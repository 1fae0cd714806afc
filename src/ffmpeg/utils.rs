//! Utility functions for FFmpeg operations.

/// Parses a bitrate string (e.g., "128k", "2M") into bits per second.
pub fn parse_bitrate(s: &str) -> u32 {
    if s.ends_with('M') {
        s.trim_end_matches('M').parse::<u32>().unwrap_or(0) * 1_000_000
    } else if s.ends_with('k') {
        s.trim_end_matches('k').parse::<u32>().unwrap_or(0) * 1000
    } else {
        s.parse::<u32>().unwrap_or(0)
    }
}

/// Estimate a segment's duration from its size and the configured
/// bitrate. Avoids relying on ffprobe timing headers, which can be
/// unreliable for very short MP3 files. Falls back to the configured
/// segment length when size or bitrate is unusable.
pub fn estimate_duration_secs(size_bytes: u64, bitrate_bps: u32, fallback_secs: u32) -> f64 {
    if size_bytes > 0 && bitrate_bps > 0 {
        (size_bytes as f64 * 8.0) / bitrate_bps as f64
    } else {
        fallback_secs as f64
    }
}

// Segment naming
pub const SEGMENT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
// strftime pattern handed to ffmpeg's segment muxer; must stay in sync
// with SEGMENT_TIMESTAMP_FORMAT above.
pub const SEGMENT_OUTPUT_PATTERN: &str = "seg_%Y%m%d_%H%M%S.mp3";

// Buffer / selection
pub const STABILITY_WINDOW_SECS: u64 = 2;
pub const SWEEP_INTERVAL_SECS: u64 = 30;

// Encoder supervision
pub const RELAUNCH_DELAY_SECS: u64 = 2;
pub const LAUNCH_FAILURE_DELAY_SECS: u64 = 5;
pub const STOP_GRACE_SECS: u64 = 5;

// Concatenation
pub const CONCAT_WAIT_TIMEOUT_SECS: u64 = 5;

// Live relay
pub const RELAY_RETRY_DELAY_SECS: u64 = 1;

// Logging / diagnostics
pub const DIAGNOSTIC_TAIL_LIMIT: usize = 500;
pub const PROGRESS_LOG_INTERVAL_SECS: u64 = 5;

// Audio defaults
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
pub const DEFAULT_AUDIO_CODEC: &str = "libmp3lame";

// FFmpeg reconnect options for live HTTP inputs
pub const RECONNECT_DELAY_MAX_SECS: u32 = 5;

// Config defaults
pub const DEFAULT_SEGMENT_SECONDS: u32 = 2;
pub const DEFAULT_BUFFER_MINUTES: u32 = 12;
pub const DEFAULT_CLEANUP_MARGIN_MINUTES: u32 = 2;
pub const DEFAULT_MAX_DOWNLOAD_MINUTES: u32 = 30;
pub const DEFAULT_DOWNLOAD_MINUTES: u32 = 2;

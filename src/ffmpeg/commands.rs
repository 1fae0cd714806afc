//! Builder for FFmpeg CLI argument vectors.
//!
//! Two commands matter here: the live-stream segmenter (one long-lived
//! process rolling `seg_*.mp3` files) and the concat demuxer (one
//! per-request process stream-copying selected segments to stdout).

use crate::constants::{
    DEFAULT_AUDIO_BITRATE, DEFAULT_AUDIO_CODEC, DEFAULT_AUDIO_SAMPLE_RATE,
    DEFAULT_SEGMENT_SECONDS, RECONNECT_DELAY_MAX_SECS,
};

#[derive(Debug, Clone)]
pub struct FfmpegCommandBuilder {
    input_url: String,
    audio_codec: String,
    audio_bitrate: String,
    sample_rate: u32,
    segment_seconds: u32,
    output_pattern: String,
}

impl FfmpegCommandBuilder {
    pub fn new(input_url: String, output_pattern: String) -> Self {
        Self {
            input_url,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            segment_seconds: DEFAULT_SEGMENT_SECONDS,
            output_pattern,
        }
    }

    pub fn with_audio_bitrate(mut self, bitrate: String) -> Self {
        self.audio_bitrate = bitrate;
        self
    }

    pub fn with_segment_seconds(mut self, seconds: u32) -> Self {
        self.segment_seconds = seconds;
        self
    }

    /// Segmenter arguments: reconnecting live HTTP input, normalized MP3
    /// output rolled into timestamped files by the segment muxer.
    pub fn build(&self) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "warning".to_string(),
            "-nostdin".to_string(),
            // Reconnect options for live HTTP streams
            "-reconnect".to_string(),
            "1".to_string(),
            "-reconnect_streamed".to_string(),
            "1".to_string(),
            "-reconnect_at_eof".to_string(),
            "1".to_string(),
            "-reconnect_delay_max".to_string(),
            RECONNECT_DELAY_MAX_SECS.to_string(),
            "-i".to_string(),
            self.input_url.clone(),
            // Normalize to mp3 for consistent segments
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            // Segmenting config
            "-f".to_string(),
            "segment".to_string(),
            "-segment_time".to_string(),
            self.segment_seconds.to_string(),
            "-reset_timestamps".to_string(),
            "1".to_string(),
            "-strftime".to_string(),
            "1".to_string(),
            self.output_pattern.clone(),
        ]
    }
}

/// Concat demuxer arguments: stream-copy the manifest's files to stdout.
/// No re-encoding, for performance and fidelity.
pub fn concat_args(manifest_path: &str) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostdin".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        // Allow absolute paths in the manifest
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        manifest_path.to_string(),
        "-c".to_string(),
        "copy".to_string(),
        "-f".to_string(),
        "mp3".to_string(),
        "pipe:1".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_segmenter_args() {
        let builder = FfmpegCommandBuilder::new(
            "http://example.net/live".to_string(),
            "/tmp/buf/seg_%Y%m%d_%H%M%S.mp3".to_string(),
        );
        let args = builder.build();

        assert_eq!(args[0], "-hide_banner");
        assert_eq!(args[3], "-nostdin");
        assert_eq!(args[12], "-i");
        assert_eq!(args[13], "http://example.net/live");
        assert_eq!(args[15], "libmp3lame");
        assert_eq!(args[17], "128k");
        assert_eq!(args[19], "44100");
        assert_eq!(args[21], "segment");
        assert_eq!(args[23], "2");
        assert_eq!(args.last().unwrap(), "/tmp/buf/seg_%Y%m%d_%H%M%S.mp3");
    }

    #[test]
    fn test_custom_bitrate_and_segment_time() {
        let args = FfmpegCommandBuilder::new("url".to_string(), "out".to_string())
            .with_audio_bitrate("192k".to_string())
            .with_segment_seconds(10)
            .build();

        assert!(args.windows(2).any(|w| w[0] == "-b:a" && w[1] == "192k"));
        assert!(args.windows(2).any(|w| w[0] == "-segment_time" && w[1] == "10"));
    }

    #[test]
    fn test_concat_args_stream_copy_to_pipe() {
        let args = concat_args("/tmp/list.txt");

        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "concat"));
        assert!(args.windows(2).any(|w| w[0] == "-safe" && w[1] == "0"));
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "/tmp/list.txt"));
        assert!(args.windows(2).any(|w| w[0] == "-c" && w[1] == "copy"));
        assert_eq!(args.last().unwrap(), "pipe:1");
    }
}

//! Streaming concatenation of selected segments.
//!
//! Writes a concat-demuxer manifest to a temp file, runs FFmpeg in
//! stream-copy mode with stdout piped, and forwards the output to the
//! caller chunk by chunk. The returned stream owns both the child
//! process (`kill_on_drop`) and the manifest temp file, so dropping it
//! on any exit path (completion, read error, client disconnect) leaves
//! no orphaned process and no temp file behind.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fs;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::io::ReaderStream;

use crate::buffer::segment::Segment;
use crate::constants::CONCAT_WAIT_TIMEOUT_SECS;
use crate::error::AppError;
use crate::ffmpeg::commands::concat_args;
use crate::ffmpeg::monitor::{diagnostic_tail, FfmpegMonitor};

/// Concatenate the segments into one MP3 byte stream.
///
/// Segments that vanished or emptied since selection (a race with the
/// sweeper) are filtered out, not failed on. If nothing concatenable
/// remains, returns `AppError::NothingToStream` rather than an empty
/// stream.
pub fn stream(
    ffmpeg_path: &str,
    segments: &[Segment],
) -> Result<impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static, AppError> {
    let valid = filter_concatenable(segments);
    if valid.is_empty() {
        return Err(AppError::NothingToStream);
    }
    if valid.len() < segments.len() {
        log::warn!(
            "Filtered {} vanished/empty segments, concatenating {}",
            segments.len() - valid.len(),
            valid.len()
        );
    }

    let manifest = write_manifest(&valid)
        .map_err(|e| AppError::Ffmpeg(format!("Failed to write concat manifest: {}", e)))?;
    let manifest_path = manifest.path().to_string_lossy().to_string();

    log::info!("Concatenating {} segments via {}", valid.len(), manifest_path);

    let mut child = Command::new(ffmpeg_path)
        .args(&concat_args(&manifest_path))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AppError::Ffmpeg(format!("FFmpeg concat spawn failed: {}", e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Ffmpeg("FFmpeg concat produced no stdout pipe".to_string()))?;
    let tail = FfmpegMonitor::start(child.stderr.take(), "CONCAT");

    // The stream owns child + manifest; both are reclaimed when it is
    // dropped, whichever exit path is taken.
    let output = async_stream::stream! {
        let mut reader = ReaderStream::new(stdout);
        let mut bytes_yielded: u64 = 0;

        while let Some(chunk) = reader.next().await {
            match chunk {
                Ok(c) => {
                    if c.is_empty() {
                        continue;
                    }
                    bytes_yielded += c.len() as u64;
                    yield Ok(c);
                }
                Err(e) => {
                    log::error!("Concat read failed after {} bytes: {}", bytes_yielded, e);
                    yield Err(e);
                    break;
                }
            }
        }

        // Output closed; reap the process. Bytes already delivered are
        // committed, so a bad exit status is diagnostics only.
        match tokio::time::timeout(
            Duration::from_secs(CONCAT_WAIT_TIMEOUT_SECS),
            child.wait(),
        )
        .await
        {
            Ok(Ok(status)) if status.success() => {
                log::info!("Concat finished, {} bytes streamed", bytes_yielded);
            }
            Ok(Ok(status)) => {
                log::error!(
                    "Concat exited with code {:?} after {} bytes: {}",
                    status.code(),
                    bytes_yielded,
                    diagnostic_tail(&tail)
                );
            }
            Ok(Err(e)) => log::error!("Failed to wait on concat process: {}", e),
            Err(_) => {
                log::warn!("Concat process did not exit promptly, killing");
                let _ = child.kill().await;
            }
        }

        drop(manifest);
    };

    Ok(output)
}

/// Re-stat every segment right before use, keeping only files that still
/// exist and are non-empty.
fn filter_concatenable(segments: &[Segment]) -> Vec<Segment> {
    segments
        .iter()
        .filter(|s| match fs::metadata(&s.path) {
            Ok(m) if m.len() > 0 => true,
            Ok(_) => {
                log::debug!("Skipping empty segment: {}", s.name);
                false
            }
            Err(_) => {
                log::debug!("Skipping vanished segment: {}", s.name);
                false
            }
        })
        .cloned()
        .collect()
}

fn write_manifest(segments: &[Segment]) -> io::Result<tempfile::NamedTempFile> {
    let mut content = String::new();
    for segment in segments {
        content.push_str(&format!("file '{}'\n", escape_manifest_path(&segment.path)));
    }

    let mut manifest = tempfile::Builder::new()
        .prefix("airshift_concat_")
        .suffix(".txt")
        .tempfile()?;
    io::Write::write_all(&mut manifest, content.as_bytes())?;
    io::Write::flush(&mut manifest)?;
    Ok(manifest)
}

/// Absolute path with forward slashes, single quotes escaped for the
/// concat demuxer's quoting rules.
fn escape_manifest_path(path: &Path) -> String {
    let absolute = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .replace('\\', "/");
    absolute.replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn segment_at(path: PathBuf) -> Segment {
        Segment {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            timestamp: chrono::Utc::now(),
            size_bytes: 1,
            modified: SystemTime::now(),
            path,
        }
    }

    #[test]
    fn test_escape_manifest_path() {
        let plain = escape_manifest_path(Path::new("/tmp/seg_20250115_120000.mp3"));
        assert_eq!(plain, "/tmp/seg_20250115_120000.mp3");

        let quoted = escape_manifest_path(Path::new("/tmp/o'brien/seg.mp3"));
        assert_eq!(quoted, "/tmp/o'\\''brien/seg.mp3");
    }

    #[test]
    fn test_manifest_lists_segments_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut segments = Vec::new();
        for name in ["seg_20250115_120000.mp3", "seg_20250115_120002.mp3"] {
            let path = temp_dir.path().join(name);
            let mut f = File::create(&path).unwrap();
            f.write_all(b"data").unwrap();
            segments.push(segment_at(path));
        }

        let manifest = write_manifest(&segments).unwrap();
        let content = fs::read_to_string(manifest.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("file '"));
        assert!(lines[0].contains("seg_20250115_120000.mp3"));
        assert!(lines[1].contains("seg_20250115_120002.mp3"));
    }

    #[test]
    fn test_filter_drops_vanished_and_empty() {
        let temp_dir = TempDir::new().unwrap();

        let good = temp_dir.path().join("seg_20250115_120000.mp3");
        File::create(&good).unwrap().write_all(b"data").unwrap();

        let empty = temp_dir.path().join("seg_20250115_120002.mp3");
        File::create(&empty).unwrap();

        let vanished = temp_dir.path().join("seg_20250115_120004.mp3");

        let segments = vec![
            segment_at(good.clone()),
            segment_at(empty),
            segment_at(vanished),
        ];

        let valid = filter_concatenable(&segments);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].path, good);
    }

    #[tokio::test]
    async fn test_stream_with_nothing_left_is_distinct() {
        let temp_dir = TempDir::new().unwrap();
        // Selected but deleted before use: must not spawn anything
        let segments = vec![segment_at(temp_dir.path().join("seg_20250115_120000.mp3"))];

        match stream("ffmpeg", &segments) {
            Err(AppError::NothingToStream) => {}
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected NothingToStream"),
        }
    }
}
